use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CompetitionAnnouncedEvent, EventHandler, EventProducer, Handler, WinnersSelectedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub winners_selected_producer: Vec<EventProducer<WinnersSelectedEvent>>,
    pub competition_announced_producer: Vec<EventProducer<CompetitionAnnouncedEvent>>,
}

pub struct EventHandlers {
    pub on_winners_selected: Option<EventHandler<WinnersSelectedEvent>>,
    pub on_competition_announced: Option<EventHandler<CompetitionAnnouncedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_winners_selected = hooks.on_winners_selected.map(|f| EventHandler::new(buffer_size, f));
        let on_competition_announced = hooks.on_competition_announced.map(|f| EventHandler::new(buffer_size, f));
        Self { on_winners_selected, on_competition_announced }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_winners_selected {
            result.winners_selected_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_competition_announced {
            result.competition_announced_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_winners_selected {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_competition_announced {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_winners_selected: Option<Handler<WinnersSelectedEvent>>,
    pub on_competition_announced: Option<Handler<CompetitionAnnouncedEvent>>,
}

impl EventHooks {
    pub fn on_winners_selected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WinnersSelectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_winners_selected = Some(Arc::new(f));
        self
    }

    pub fn on_competition_announced<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CompetitionAnnouncedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_competition_announced = Some(Arc::new(f));
        self
    }
}
