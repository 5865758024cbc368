use podium_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The money ledger adapter: the engine's view of the external payment processor.
///
/// The processor is an unreliable, eventually-consistent external system. Every call can fail,
/// and a successful call only means the processor *accepted* the request — settlement is reported
/// later via webhooks or discovered by polling. Implementations are plain clients; they hold no
/// business state, which is what lets tests swap in doubles.
#[allow(async_fn_in_trait)]
pub trait MoneyLedger {
    /// Creates a charge intent for the given amount. The returned `client_secret` is handed to
    /// the payer's client to complete the charge out-of-band.
    async fn create_charge(
        &self,
        amount: Cents,
        currency: &str,
        metadata: ChargeMetadata,
    ) -> Result<ChargeIntent, LedgerError>;

    /// The processor's live view of a charge intent.
    async fn get_charge(&self, charge_id: &str) -> Result<ChargeIntent, LedgerError>;

    /// Creates an outbound transfer. The idempotency key is the only defence against duplicate
    /// transfers under retries; the processor deduplicates on it.
    async fn create_transfer(&self, request: TransferRequest) -> Result<TransferRef, LedgerError>;

    /// The platform's available balance.
    async fn get_balance(&self) -> Result<LedgerBalance, LedgerError>;
}

//--------------------------------------     ChargeState      --------------------------------------------------------
/// The processor-side lifecycle of a charge intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeState {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresAction,
    RequiresConfirmation,
    Canceled,
    Other(String),
}

impl ChargeState {
    /// The charge can no longer complete; creating a replacement charge is allowed.
    pub fn is_replaceable(&self) -> bool {
        matches!(self, ChargeState::RequiresPaymentMethod | ChargeState::Canceled)
    }

    /// The charge is still live on the processor side; surface it rather than creating another.
    pub fn is_open(&self) -> bool {
        matches!(self, ChargeState::Processing | ChargeState::RequiresAction | ChargeState::RequiresConfirmation)
    }
}

impl std::fmt::Display for ChargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeState::Succeeded => write!(f, "succeeded"),
            ChargeState::Processing => write!(f, "processing"),
            ChargeState::RequiresPaymentMethod => write!(f, "requires_payment_method"),
            ChargeState::RequiresAction => write!(f, "requires_action"),
            ChargeState::RequiresConfirmation => write!(f, "requires_confirmation"),
            ChargeState::Canceled => write!(f, "canceled"),
            ChargeState::Other(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for ChargeState {
    fn from(value: &str) -> Self {
        match value {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_action" => Self::RequiresAction,
            "requires_confirmation" => Self::RequiresConfirmation,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }
}

//--------------------------------------     ChargeIntent     --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeIntent {
    pub charge_id: String,
    /// The client-completion token the payer needs to finish the charge.
    pub client_secret: String,
    pub status: ChargeState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargeMetadata {
    pub user_id: i64,
    pub competition_id: i64,
    pub submission_id: i64,
    pub purpose: String,
}

//--------------------------------------      Transfers       --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub amount: Cents,
    pub currency: String,
    /// The destination payout account on the processor.
    pub destination: String,
    pub idempotency_key: String,
    pub metadata: TransferMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub competition_id: i64,
    pub submission_id: i64,
    pub placement: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRef {
    pub transfer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerBalance {
    pub available: Cents,
}

//--------------------------------------     LedgerEvent      --------------------------------------------------------
/// A processor webhook event, already authenticated and mapped from the wire envelope. Events the
/// engine does not recognise still arrive here so that the reconciler can acknowledge them
/// without acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    ChargeSucceeded { charge_id: String },
    ChargeFailed { charge_id: String, message: Option<String> },
    TransferPaid { transfer_id: String },
    TransferFailed { transfer_id: String, failure_code: Option<String>, failure_message: Option<String> },
    TransferCreated { transfer_id: String, amount: Cents, destination: String },
    Unrecognized { event_type: String },
}

//--------------------------------------     LedgerError      --------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Processor rejected the request: {0}")]
    Api(String),
    #[error("Could not reach the payment processor: {0}")]
    Connection(String),
    #[error("Payment processor authentication failed")]
    Authentication,
    #[error("The processor has no record of {0}")]
    NotFound(String),
}
