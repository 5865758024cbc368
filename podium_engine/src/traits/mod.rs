//! The trait interfaces that backends must implement to power the settlement engine.
//!
//! * [`CompetitionManagement`] — reading and transitioning competitions and submissions.
//! * [`JudgingManagement`] — judge assignments and score persistence.
//! * [`SettlementDatabase`] — the payment record store and the atomic reconciliation updates.
//! * [`MoneyLedger`] — the external payment processor adapter.

mod competition_management;
mod data_objects;
mod judging_management;
mod ledger;
mod settlement_database;

pub use competition_management::CompetitionManagement;
pub use data_objects::{EntryFeeReceipt, JudgingStats};
pub use judging_management::JudgingManagement;
pub use ledger::{
    ChargeIntent,
    ChargeMetadata,
    ChargeState,
    LedgerBalance,
    LedgerError,
    LedgerEvent,
    MoneyLedger,
    TransferMetadata,
    TransferRef,
    TransferRequest,
};
pub use settlement_database::{SettlementDatabase, StorageError};
