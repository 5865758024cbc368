use crate::{
    db_types::{JudgeAssignment, NewJudgeAssignment},
    scoring::{FeedbackEntry, ScoreSheet},
    traits::{JudgingStats, StorageError},
};

/// Judge assignment bookkeeping and score persistence.
#[allow(async_fn_in_trait)]
pub trait JudgingManagement {
    /// Creates the given assignments, silently skipping any (judge, submission) pair that already
    /// exists. The unique constraint on the pair is a hard invariant; this call is idempotent.
    async fn insert_assignments(
        &self,
        assignments: &[NewJudgeAssignment],
    ) -> Result<Vec<JudgeAssignment>, StorageError>;

    async fn fetch_assignment(
        &self,
        judge_id: i64,
        submission_id: i64,
    ) -> Result<Option<JudgeAssignment>, StorageError>;

    async fn fetch_assignments_for_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<JudgeAssignment>, StorageError>;

    async fn fetch_assignments_for_competition(
        &self,
        competition_id: i64,
    ) -> Result<Vec<JudgeAssignment>, StorageError>;

    /// Assigned/completed counts for every submission of the competition that has at least one
    /// assignment.
    async fn judging_stats(&self, competition_id: i64) -> Result<JudgingStats, StorageError>;

    /// Persists the updated score sheet, feedback list and recomputed final score for a
    /// submission in a single transaction.
    ///
    /// When `completing_judge` is given (i.e. the scorer is the assigned judge, not a privileged
    /// override), the judge's assignment has `completed_at` set — once; subsequent score edits do
    /// not move the timestamp.
    async fn save_scores(
        &self,
        submission_id: i64,
        human_scores: &ScoreSheet,
        judge_feedback: &[FeedbackEntry],
        final_score: f64,
        completing_judge: Option<i64>,
    ) -> Result<crate::db_types::Submission, StorageError>;
}
