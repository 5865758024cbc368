use thiserror::Error;

use crate::{
    db_types::{NewPayment, Payment, PayoutAccount, PaymentStatus},
    traits::{CompetitionManagement, EntryFeeReceipt, JudgingManagement},
    winners::PlannedWinner,
};

/// The highest-level storage behaviour required by the settlement reconciler: the durable payment
/// record store plus the atomic multi-row updates that reconciliation relies on.
///
/// Implementations must guarantee that [`confirm_entry_fee`](Self::confirm_entry_fee) and
/// [`settle_transfer`](Self::settle_transfer) perform their check-then-act sequence atomically
/// (a single conditional update or a row lock held for the duration) — the two racing triggers of
/// the entry-fee path have no other synchronisation.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + CompetitionManagement + JudgingManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// The entry-fee payment currently attached to the submission, if any. At most one non-failed
    /// entry-fee payment exists per submission; the invariant is enforced at write time.
    async fn fetch_entry_fee_payment(&self, submission_id: i64) -> Result<Option<Payment>, StorageError>;

    async fn fetch_payment_by_charge_id(&self, charge_id: &str) -> Result<Option<Payment>, StorageError>;

    async fn fetch_payment_by_transfer_id(&self, transfer_id: &str) -> Result<Option<Payment>, StorageError>;

    /// Records a new Pending entry-fee payment. Fails with
    /// [`StorageError::DuplicatePendingPayment`] if a Pending entry-fee payment already exists for
    /// the submission — a replacement charge requires the prior one to have been failed first.
    async fn insert_entry_fee_payment(&self, payment: NewPayment) -> Result<Payment, StorageError>;

    /// Applies the entry-fee success effects, exactly once, in a single transaction:
    /// payment → Completed with `processed_at`; submission → Submitted with `submitted_at` (if
    /// not already set); `current_entries` incremented; `prize_pool` credited with the
    /// fee-after-platform-cut.
    ///
    /// If the payment is already terminal the call is a no-op and the receipt reports
    /// `applied == false`. This conditional update is the sole idempotency boundary between the
    /// webhook and the client-poll triggers.
    async fn confirm_entry_fee(&self, charge_id: &str) -> Result<EntryFeeReceipt, StorageError>;

    /// Marks the entry-fee payment as Failed with `processed_at` set. No competition or
    /// submission state is touched. Returns `None` if the payment was already terminal.
    async fn fail_entry_fee(&self, charge_id: &str) -> Result<Option<Payment>, StorageError>;

    /// Records a new Pending prize-payout payment carrying the external transfer reference.
    async fn insert_prize_payout(&self, payment: NewPayment) -> Result<Payment, StorageError>;

    /// The most relevant prize-payout payment for the submission: a non-failed one if any exists,
    /// otherwise the latest failed attempt.
    async fn fetch_prize_payout(&self, submission_id: i64) -> Result<Option<Payment>, StorageError>;

    async fn fetch_payouts_for_competition(&self, competition_id: i64) -> Result<Vec<Payment>, StorageError>;

    async fn fetch_payouts_for_user(&self, user_id: i64) -> Result<Vec<Payment>, StorageError>;

    /// Transitions the payment with the given transfer reference from Pending to the given
    /// terminal status, setting `processed_at`. Returns `None` when no payment carries the
    /// reference or it is already terminal.
    async fn settle_transfer(&self, transfer_id: &str, status: PaymentStatus)
        -> Result<Option<Payment>, StorageError>;

    async fn fetch_payout_account(&self, user_id: i64) -> Result<Option<PayoutAccount>, StorageError>;

    async fn upsert_payout_account(&self, account: PayoutAccount) -> Result<(), StorageError>;

    /// Commits a validated winner selection atomically: each winner moves to Winner status with
    /// its placement set; every other Submitted/UnderReview submission of the competition moves
    /// to NotSelected. The competition status is not touched.
    async fn commit_winner_selection(
        &self,
        competition_id: i64,
        winners: &[PlannedWinner],
    ) -> Result<(), StorageError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Internal database engine error: {0}")]
    DatabaseError(String),
    #[error("The requested competition {0} does not exist")]
    CompetitionNotFound(i64),
    #[error("The requested submission {0} does not exist")]
    SubmissionNotFound(i64),
    #[error("No payment exists for charge {0}")]
    PaymentNotFoundForCharge(String),
    #[error("No payment exists for transfer {0}")]
    PaymentNotFoundForTransfer(String),
    #[error("A pending entry-fee payment already exists for submission {0}")]
    DuplicatePendingPayment(i64),
    #[error("Stored record is malformed: {0}")]
    MalformedRecord(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::MalformedRecord(e.to_string())
    }
}
