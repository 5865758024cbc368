use crate::{db_types::Competition, winners::PlannedWinner};

/// Fired after a winner selection has been committed. Carries everything a notification channel
/// needs to congratulate winners and thank the rest of the field. Delivery is best-effort: the
/// commit has already happened by the time this event exists.
#[derive(Debug, Clone)]
pub struct WinnersSelectedEvent {
    pub competition: Competition,
    pub winners: Vec<PlannedWinner>,
    /// Submission ids of eligible entries that were not selected.
    pub not_selected: Vec<i64>,
}

/// Fired when a competition leaves Draft and becomes publicly announced (Draft → Upcoming).
#[derive(Debug, Clone)]
pub struct CompetitionAnnouncedEvent {
    pub competition: Competition,
}

impl CompetitionAnnouncedEvent {
    pub fn new(competition: Competition) -> Self {
        Self { competition }
    }
}
