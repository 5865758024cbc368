//! Wire types for the processor's REST API and webhook feed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct NewChargeRequest {
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeResponse {
    pub id: String,
    pub client_secret: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransferRequest {
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub destination: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    pub available: Vec<BalanceBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceBucket {
    pub amount: i64,
    pub currency: String,
}

/// The envelope the processor posts to the webhook endpoint: `{"type": ..., "data": {...}}`.
/// `data` stays untyped here; the server maps known event types onto engine events and passes
/// everything else through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl WebhookEnvelope {
    pub fn object_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn field_i64(&self, field: &str) -> Option<i64> {
        self.data.get(field).and_then(Value::as_i64)
    }
}
