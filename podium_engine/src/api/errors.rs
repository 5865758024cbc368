use podium_common::Cents;
use thiserror::Error;

use crate::{
    scoring::ScoreValidationError,
    traits::{LedgerError, StorageError},
    winners::WinnerSelectionError,
};

//--------------------------------------   JudgingApiError    --------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum JudgingApiError {
    #[error("The requested {0} does not exist")]
    NotFound(String),
    #[error("Judge {judge_id} is not assigned to submission {submission_id}")]
    NotAssigned { judge_id: i64, submission_id: i64 },
    #[error("{0}")]
    InvalidScores(#[from] ScoreValidationError),
    #[error("{subject} must be in {required} status. Current status: {actual}")]
    WrongState { subject: String, required: String, actual: String },
    // From<StorageError> is implemented manually so missing-row errors fold into NotFound
    #[error("{0}")]
    StorageError(StorageError),
}

//--------------------------------------  LifecycleApiError   --------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum LifecycleApiError {
    #[error("The requested {0} does not exist")]
    NotFound(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    InvalidWinnerSelection(#[from] WinnerSelectionError),
    #[error("{0}")]
    StorageError(#[from] StorageError),
}

//-------------------------------------- SettlementApiError   --------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum SettlementApiError {
    #[error("The requested {0} does not exist")]
    NotFound(String),
    #[error("Not authorized: {0}")]
    Forbidden(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Insufficient platform balance. Need {needed}, have {available}")]
    InsufficientBalance { needed: Cents, available: Cents },
    #[error("Payment processor call failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("{0}")]
    StorageError(#[from] StorageError),
}
