//! `SqliteDatabase` is the concrete storage backend for the settlement engine.
//!
//! Unsurprisingly, it uses SQLite and implements all the traits defined in the [`crate::traits`]
//! module. Multi-row invariants (the entry-fee success effects, winner-selection commit, score
//! persistence) run inside a single transaction; everything else delegates to the free functions
//! in [`super::db`].
use std::fmt::Debug;

use log::*;
use podium_common::Cents;
use sqlx::SqlitePool;

use super::db::{assignments, competitions, db_url, new_pool, payments, payout_accounts, submissions};
use crate::{
    db_types::{
        Competition,
        CompetitionStatus,
        JudgeAssignment,
        NewCompetition,
        NewJudgeAssignment,
        NewPayment,
        NewSubmission,
        Payment,
        PaymentStatus,
        PayoutAccount,
        Submission,
        SubmissionStatus,
    },
    scoring::{FeedbackEntry, ScoreSheet},
    traits::{
        CompetitionManagement,
        EntryFeeReceipt,
        JudgingManagement,
        JudgingStats,
        SettlementDatabase,
        StorageError,
    },
    winners::PlannedWinner,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the url from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CompetitionManagement for SqliteDatabase {
    async fn fetch_competition(&self, id: i64) -> Result<Option<Competition>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        competitions::fetch_competition(id, &mut conn).await
    }

    async fn fetch_submission(&self, id: i64) -> Result<Option<Submission>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        submissions::fetch_submission(id, &mut conn).await
    }

    async fn fetch_submissions_with_status(
        &self,
        competition_id: i64,
        statuses: &[SubmissionStatus],
    ) -> Result<Vec<Submission>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        submissions::fetch_with_status(competition_id, statuses, &mut conn).await
    }

    async fn count_submissions(&self, competition_id: i64) -> Result<i64, StorageError> {
        let mut conn = self.pool.acquire().await?;
        submissions::count_for_competition(competition_id, &mut conn).await
    }

    async fn count_winners(&self, competition_id: i64) -> Result<i64, StorageError> {
        let mut conn = self.pool.acquire().await?;
        submissions::count_with_status(competition_id, SubmissionStatus::Winner, &mut conn).await
    }

    async fn insert_competition(&self, competition: NewCompetition) -> Result<Competition, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let competition = competitions::insert_competition(competition, &mut conn).await?;
        debug!("🗃️ Competition '{}' saved with id {}", competition.title, competition.id);
        Ok(competition)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let submission = submissions::insert_submission(submission, &mut conn).await?;
        debug!("🗃️ Submission '{}' saved with id {}", submission.title, submission.id);
        Ok(submission)
    }

    async fn update_competition_status(
        &self,
        id: i64,
        status: CompetitionStatus,
    ) -> Result<Competition, StorageError> {
        let mut conn = self.pool.acquire().await?;
        competitions::update_status(id, status, &mut conn).await
    }

    async fn update_submission_status(&self, id: i64, status: SubmissionStatus) -> Result<Submission, StorageError> {
        let mut conn = self.pool.acquire().await?;
        submissions::update_status(id, status, &mut conn).await
    }

    async fn delete_competition(&self, id: i64) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        competitions::delete_competition(id, &mut conn).await
    }
}

impl JudgingManagement for SqliteDatabase {
    async fn insert_assignments(
        &self,
        new_assignments: &[NewJudgeAssignment],
    ) -> Result<Vec<JudgeAssignment>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(new_assignments.len());
        for assignment in new_assignments {
            if let Some(a) = assignments::idempotent_insert(assignment, &mut tx).await? {
                created.push(a);
            }
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn fetch_assignment(
        &self,
        judge_id: i64,
        submission_id: i64,
    ) -> Result<Option<JudgeAssignment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        assignments::fetch_assignment(judge_id, submission_id, &mut conn).await
    }

    async fn fetch_assignments_for_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<JudgeAssignment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        assignments::fetch_for_submission(submission_id, &mut conn).await
    }

    async fn fetch_assignments_for_competition(
        &self,
        competition_id: i64,
    ) -> Result<Vec<JudgeAssignment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        assignments::fetch_for_competition(competition_id, &mut conn).await
    }

    async fn judging_stats(&self, competition_id: i64) -> Result<JudgingStats, StorageError> {
        let mut conn = self.pool.acquire().await?;
        assignments::judging_stats(competition_id, &mut conn).await
    }

    /// Score sheets, feedback, final score and the assignment's completion stamp land in one
    /// transaction, so a judge either sees their whole score recorded or none of it.
    async fn save_scores(
        &self,
        submission_id: i64,
        human_scores: &ScoreSheet,
        judge_feedback: &[FeedbackEntry],
        final_score: f64,
        completing_judge: Option<i64>,
    ) -> Result<Submission, StorageError> {
        let mut tx = self.pool.begin().await?;
        let submission =
            submissions::save_scores(submission_id, human_scores, judge_feedback, final_score, &mut tx).await?;
        if let Some(judge_id) = completing_judge {
            let newly_completed = assignments::complete_once(judge_id, submission_id, &mut tx).await?;
            if newly_completed {
                debug!("🗃️ Judge {judge_id} completed their assignment for submission {submission_id}");
            }
        }
        tx.commit().await?;
        Ok(submission)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_entry_fee_payment(&self, submission_id: i64) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_entry_fee_payment(submission_id, &mut conn).await
    }

    async fn fetch_payment_by_charge_id(&self, charge_id: &str) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_by_charge_id(charge_id, &mut conn).await
    }

    async fn fetch_payment_by_transfer_id(&self, transfer_id: &str) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_by_transfer_id(transfer_id, &mut conn).await
    }

    async fn insert_entry_fee_payment(&self, payment: NewPayment) -> Result<Payment, StorageError> {
        let submission_id = payment.submission_id.unwrap_or_default();
        let mut tx = self.pool.begin().await?;
        if payments::pending_entry_fee_exists(submission_id, &mut tx).await? {
            return Err(StorageError::DuplicatePendingPayment(submission_id));
        }
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    /// Applies the entry-fee success effects exactly once.
    ///
    /// The conditional `status = 'Pending'` update is the idempotency boundary; when it matches
    /// no row the charge has either never been seen (an error) or was already settled (a benign
    /// no-op), and in neither case is any competition or submission state touched. When it does
    /// match, the submission flip and the pool credit commit atomically with it.
    async fn confirm_entry_fee(&self, charge_id: &str) -> Result<EntryFeeReceipt, StorageError> {
        let mut tx = self.pool.begin().await?;
        let updated = payments::complete_pending_by_charge(charge_id, &mut tx).await?;
        let payment = match updated {
            None => {
                return match payments::fetch_by_charge_id(charge_id, &mut tx).await? {
                    None => Err(StorageError::PaymentNotFoundForCharge(charge_id.to_string())),
                    Some(p) => {
                        debug!("🗃️ Payment {} already {}; entry-fee effects skipped", p.id, p.status);
                        Ok(EntryFeeReceipt { payment: p, applied: false, pool_contribution: Cents::from(0) })
                    },
                };
            },
            Some(p) => p,
        };

        let mut pool_contribution = Cents::from(0);
        match payment.submission_id {
            Some(submission_id) => {
                let submission = submissions::mark_submitted(submission_id, &mut tx).await?;
                let competition = competitions::fetch_competition(payment.competition_id, &mut tx)
                    .await?
                    .ok_or(StorageError::CompetitionNotFound(payment.competition_id))?;
                pool_contribution = competition.pool_contribution();
                competitions::apply_entry_credit(competition.id, pool_contribution, &mut tx).await?;
                debug!(
                    "🗃️ Entry fee {charge_id} settled: submission {} is Submitted, competition {} credited {}",
                    submission.id, competition.id, pool_contribution
                );
            },
            None => {
                warn!("🗃️ Payment {} has no associated submission; only the payment was updated", payment.id);
            },
        }
        tx.commit().await?;
        Ok(EntryFeeReceipt { payment, applied: true, pool_contribution })
    }

    async fn fail_entry_fee(&self, charge_id: &str) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fail_pending_by_charge(charge_id, &mut conn).await?;
        if payment.is_none() && payments::fetch_by_charge_id(charge_id, &mut conn).await?.is_none() {
            return Err(StorageError::PaymentNotFoundForCharge(charge_id.to_string()));
        }
        Ok(payment)
    }

    async fn insert_prize_payout(&self, payment: NewPayment) -> Result<Payment, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    async fn fetch_prize_payout(&self, submission_id: i64) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payout_for_submission(submission_id, &mut conn).await
    }

    async fn fetch_payouts_for_competition(&self, competition_id: i64) -> Result<Vec<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payouts_for_competition(competition_id, &mut conn).await
    }

    async fn fetch_payouts_for_user(&self, user_id: i64) -> Result<Vec<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payouts_for_user(user_id, &mut conn).await
    }

    async fn settle_transfer(
        &self,
        transfer_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::settle_pending_by_transfer(transfer_id, status, &mut conn).await
    }

    async fn fetch_payout_account(&self, user_id: i64) -> Result<Option<PayoutAccount>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payout_accounts::fetch_payout_account(user_id, &mut conn).await
    }

    async fn upsert_payout_account(&self, account: PayoutAccount) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        payout_accounts::upsert_payout_account(&account, &mut conn).await
    }

    /// Winners flip to Winner-with-placement and the rest of the eligible field to NotSelected in
    /// one transaction, so a failure partway leaves the field untouched.
    async fn commit_winner_selection(
        &self,
        competition_id: i64,
        winners: &[PlannedWinner],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        for winner in winners {
            submissions::set_winner(winner.submission_id, &winner.place, &mut tx).await?;
        }
        let demoted = submissions::mark_not_selected(competition_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Winner selection committed for competition {competition_id}: {} winners, {demoted} not selected",
            winners.len()
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}
