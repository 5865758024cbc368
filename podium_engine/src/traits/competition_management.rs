use crate::{
    db_types::{Competition, CompetitionStatus, NewCompetition, NewSubmission, Submission, SubmissionStatus},
    traits::StorageError,
};

/// Read and transition access to competitions and submissions.
///
/// The broader CRUD surface (listing, searching, media, ownership administration) lives outside
/// this core; these are the operations the settlement and judging engines need.
#[allow(async_fn_in_trait)]
pub trait CompetitionManagement {
    async fn fetch_competition(&self, id: i64) -> Result<Option<Competition>, StorageError>;

    async fn fetch_submission(&self, id: i64) -> Result<Option<Submission>, StorageError>;

    /// All submissions of the competition whose status is in `statuses`.
    async fn fetch_submissions_with_status(
        &self,
        competition_id: i64,
        statuses: &[SubmissionStatus],
    ) -> Result<Vec<Submission>, StorageError>;

    /// Total number of submissions for the competition, regardless of status.
    async fn count_submissions(&self, competition_id: i64) -> Result<i64, StorageError>;

    /// Number of submissions currently in `Winner` status.
    async fn count_winners(&self, competition_id: i64) -> Result<i64, StorageError>;

    async fn insert_competition(&self, competition: NewCompetition) -> Result<Competition, StorageError>;

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, StorageError>;

    /// Writes the new status. Transition *validation* is the caller's responsibility; this is the
    /// plain state write used once the guards have passed.
    async fn update_competition_status(
        &self,
        id: i64,
        status: CompetitionStatus,
    ) -> Result<Competition, StorageError>;

    async fn update_submission_status(&self, id: i64, status: SubmissionStatus) -> Result<Submission, StorageError>;

    /// Deletes the competition and, by cascade, its submissions and payments. Callers must have
    /// verified the competition is still in Draft.
    async fn delete_competition(&self, id: i64) -> Result<(), StorageError>;
}
