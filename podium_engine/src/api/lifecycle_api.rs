use log::*;

use crate::{
    api::{errors::LifecycleApiError, objects::WinnerSelectionOutcome},
    db_types::{Competition, CompetitionStatus, SubmissionStatus},
    events::{CompetitionAnnouncedEvent, EventProducers, WinnersSelectedEvent},
    ranking::JudgingProgress,
    traits::SettlementDatabase,
    winners::{validate_winner_selection, WinnerPick},
};

/// `CompetitionApi` owns the competition lifecycle state machine and the winner-selection commit.
pub struct CompetitionApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> CompetitionApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> std::fmt::Debug for CompetitionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompetitionApi")
    }
}

impl<B> CompetitionApi<B>
where B: SettlementDatabase
{
    /// Requests a lifecycle transition for the competition.
    ///
    /// The forward chain is Draft → Upcoming → Active → Closed → Judging → Complete, enforced by
    /// the CRUD layer; this core only validates the structural guard on entering `Complete`:
    /// * the competition must currently be in Judging,
    /// * at least one submission must hold Winner status,
    /// * the winner count must equal the number of places in the prize structure.
    ///
    /// On a failed guard nothing is written. The Draft → Upcoming edge fires the announcement
    /// hook after committing.
    pub async fn transition_status(
        &self,
        competition_id: i64,
        new_status: CompetitionStatus,
    ) -> Result<Competition, LifecycleApiError> {
        let competition = self
            .db
            .fetch_competition(competition_id)
            .await?
            .ok_or_else(|| LifecycleApiError::NotFound(format!("competition {competition_id}")))?;

        if new_status == CompetitionStatus::Complete {
            self.check_completion_guard(&competition).await?;
        }

        let old_status = competition.status;
        let updated = self.db.update_competition_status(competition_id, new_status).await?;
        info!("🏁️ Competition {competition_id} moved from {old_status} to {new_status}");

        if old_status == CompetitionStatus::Draft && new_status == CompetitionStatus::Upcoming {
            for producer in &self.producers.competition_announced_producer {
                producer.publish_event(CompetitionAnnouncedEvent::new(updated.clone())).await;
            }
        }
        Ok(updated)
    }

    async fn check_completion_guard(&self, competition: &Competition) -> Result<(), LifecycleApiError> {
        if competition.status != CompetitionStatus::Judging {
            return Err(LifecycleApiError::PreconditionFailed(format!(
                "Cannot complete competition. Must be in Judging status. Current status: {}",
                competition.status
            )));
        }
        let winner_count = self.db.count_winners(competition.id).await?;
        if winner_count == 0 {
            return Err(LifecycleApiError::PreconditionFailed(
                "Cannot complete competition. No winners have been selected yet.".to_string(),
            ));
        }
        let expected = competition.prize_structure.len() as i64;
        if winner_count != expected {
            return Err(LifecycleApiError::PreconditionFailed(format!(
                "Cannot complete competition. Expected {expected} winners but found {winner_count}."
            )));
        }
        Ok(())
    }

    /// Deletes a competition. Only Draft competitions may be deleted; the cascade removes its
    /// submissions and payments.
    pub async fn delete_competition(&self, competition_id: i64) -> Result<(), LifecycleApiError> {
        let competition = self
            .db
            .fetch_competition(competition_id)
            .await?
            .ok_or_else(|| LifecycleApiError::NotFound(format!("competition {competition_id}")))?;
        if competition.status != CompetitionStatus::Draft {
            return Err(LifecycleApiError::PreconditionFailed(format!(
                "Can only delete Draft competitions. Current status: {}",
                competition.status
            )));
        }
        self.db.delete_competition(competition_id).await?;
        info!("🏁️ Competition {competition_id} deleted");
        Ok(())
    }

    /// Validates and commits a winner selection.
    ///
    /// Validation runs through [`validate_winner_selection`]; on success the commit is atomic:
    /// winners transition to Winner with their placement, every other eligible submission
    /// transitions to NotSelected, and the competition *stays* in Judging — completing it is a
    /// separate administrative step. Notification fan-out is best-effort and can never fail or
    /// roll back the commit.
    pub async fn select_winners(
        &self,
        competition_id: i64,
        picks: Vec<WinnerPick>,
    ) -> Result<WinnerSelectionOutcome, LifecycleApiError> {
        let competition = self
            .db
            .fetch_competition(competition_id)
            .await?
            .ok_or_else(|| LifecycleApiError::NotFound(format!("competition {competition_id}")))?;

        let eligible = self
            .db
            .fetch_submissions_with_status(competition_id, &[
                SubmissionStatus::Submitted,
                SubmissionStatus::UnderReview,
            ])
            .await?;
        let stats = self.db.judging_stats(competition_id).await?;
        let eligible: Vec<_> = eligible
            .into_iter()
            .map(|s| {
                let progress = stats.get(&s.id).copied().unwrap_or(JudgingProgress::default());
                (s, progress)
            })
            .collect();

        let winners = validate_winner_selection(&competition, &picks, &eligible)?;
        let not_selected: Vec<i64> = eligible
            .iter()
            .map(|(s, _)| s.id)
            .filter(|id| !winners.iter().any(|w| w.submission_id == *id))
            .collect();

        self.db.commit_winner_selection(competition_id, &winners).await?;
        info!(
            "🏁️ {} winners committed for competition {competition_id}; {} submissions not selected",
            winners.len(),
            not_selected.len()
        );

        for producer in &self.producers.winners_selected_producer {
            debug!("🏁️ Notifying winners-selected hook subscribers");
            let event = WinnersSelectedEvent {
                competition: competition.clone(),
                winners: winners.clone(),
                not_selected: not_selected.clone(),
            };
            producer.publish_event(event).await;
        }

        Ok(WinnerSelectionOutcome { competition_id, status: competition.status, winners })
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
