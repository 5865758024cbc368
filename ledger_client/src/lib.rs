//! A thin REST client for the external payment processor.
//!
//! The processor exposes charge intents (inbound entry fees), transfers (outbound prize payouts),
//! a platform balance, and a signed webhook feed. This crate only speaks the wire protocol; all
//! settlement semantics live in the engine.
mod api;
mod config;
pub mod data_objects;
mod error;

pub use api::LedgerApi;
pub use config::LedgerConfig;
pub use data_objects::{BalanceResponse, ChargeResponse, TransferResponse, WebhookEnvelope};
pub use error::LedgerApiError;
