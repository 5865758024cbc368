//! Notification fan-out.
//!
//! Winner selection and competition announcements trigger notifications to participants. The
//! notification service is an external collaborator; this module subscribes to the engine's
//! event hooks and forwards payloads to it fire-and-forget. Delivery failures are logged and
//! swallowed — a lost email must never roll back a winner commit.

use log::*;
use podium_engine::events::{CompetitionAnnouncedEvent, EventHooks, WinnersSelectedEvent};
use serde_json::json;

pub fn notification_hooks(notification_url: Option<String>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let winners_url = notification_url.clone();
    hooks.on_winners_selected(move |event| {
        let url = winners_url.clone();
        Box::pin(async move {
            notify_winners_selected(url, event).await;
        })
    });
    hooks.on_competition_announced(move |event| {
        let url = notification_url.clone();
        Box::pin(async move {
            notify_competition_announced(url, event).await;
        })
    });
    hooks
}

async fn notify_winners_selected(url: Option<String>, event: WinnersSelectedEvent) {
    info!(
        "📣️ Competition '{}' has winners: {} selected, {} not selected",
        event.competition.title,
        event.winners.len(),
        event.not_selected.len()
    );
    let Some(url) = url else {
        debug!("📣️ No notification URL configured; skipping delivery");
        return;
    };
    let payload = json!({
        "kind": "winners_selected",
        "competition_id": event.competition.id,
        "competition_title": event.competition.title,
        "winners": event.winners,
        "not_selected": event.not_selected,
    });
    post_notification(&url, payload).await;
}

async fn notify_competition_announced(url: Option<String>, event: CompetitionAnnouncedEvent) {
    info!("📣️ Competition '{}' has been announced", event.competition.title);
    let Some(url) = url else {
        debug!("📣️ No notification URL configured; skipping delivery");
        return;
    };
    let payload = json!({
        "kind": "competition_announced",
        "competition_id": event.competition.id,
        "competition_title": event.competition.title,
        "entry_fee": event.competition.entry_fee,
        "max_entries": event.competition.max_entries,
    });
    post_notification(&url, payload).await;
}

async fn post_notification(url: &str, payload: serde_json::Value) {
    match reqwest::Client::new().post(url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("📣️ Notification delivered");
        },
        Ok(response) => {
            warn!("📣️ Notification service answered {}; dropping the notification", response.status());
        },
        Err(e) => {
            warn!("📣️ Could not reach the notification service: {e}. Dropping the notification");
        },
    }
}
