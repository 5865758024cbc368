//! Adapts the processor REST client to the engine's [`MoneyLedger`] trait, and maps webhook
//! envelopes onto engine events.

use std::collections::HashMap;

use ledger_client::{data_objects::WebhookEnvelope, LedgerApi, LedgerApiError};
use podium_common::Cents;
use podium_engine::traits::{
    ChargeIntent,
    ChargeMetadata,
    ChargeState,
    LedgerBalance,
    LedgerError,
    LedgerEvent,
    MoneyLedger,
    TransferRef,
    TransferRequest,
};

/// Webhook event types the settlement reconciler acts on. Everything else is acknowledged and
/// logged, never rejected.
pub const EVENT_CHARGE_SUCCEEDED: &str = "charge.succeeded";
pub const EVENT_CHARGE_FAILED: &str = "charge.payment_failed";
pub const EVENT_TRANSFER_PAID: &str = "transfer.paid";
pub const EVENT_TRANSFER_FAILED: &str = "transfer.failed";
pub const EVENT_TRANSFER_CREATED: &str = "transfer.created";

#[derive(Clone)]
pub struct ProcessorLedger {
    api: LedgerApi,
}

impl ProcessorLedger {
    pub fn new(api: LedgerApi) -> Self {
        Self { api }
    }
}

impl MoneyLedger for ProcessorLedger {
    async fn create_charge(
        &self,
        amount: Cents,
        currency: &str,
        metadata: ChargeMetadata,
    ) -> Result<ChargeIntent, LedgerError> {
        let meta = HashMap::from([
            ("user_id".to_string(), metadata.user_id.to_string()),
            ("competition_id".to_string(), metadata.competition_id.to_string()),
            ("submission_id".to_string(), metadata.submission_id.to_string()),
            ("purpose".to_string(), metadata.purpose),
        ]);
        let charge = self.api.create_charge(amount.value(), currency, meta).await.map_err(to_ledger_error)?;
        Ok(ChargeIntent {
            charge_id: charge.id,
            client_secret: charge.client_secret,
            status: ChargeState::from(charge.status.as_str()),
        })
    }

    async fn get_charge(&self, charge_id: &str) -> Result<ChargeIntent, LedgerError> {
        let charge = self.api.get_charge(charge_id).await.map_err(to_ledger_error)?;
        Ok(ChargeIntent {
            charge_id: charge.id,
            client_secret: charge.client_secret,
            status: ChargeState::from(charge.status.as_str()),
        })
    }

    async fn create_transfer(&self, request: TransferRequest) -> Result<TransferRef, LedgerError> {
        let meta = HashMap::from([
            ("competition_id".to_string(), request.metadata.competition_id.to_string()),
            ("submission_id".to_string(), request.metadata.submission_id.to_string()),
            ("placement".to_string(), request.metadata.placement),
            ("user_id".to_string(), request.metadata.user_id.to_string()),
        ]);
        let transfer = self
            .api
            .create_transfer(
                request.amount.value(),
                &request.currency,
                &request.destination,
                &request.idempotency_key,
                meta,
            )
            .await
            .map_err(to_ledger_error)?;
        Ok(TransferRef { transfer_id: transfer.id })
    }

    async fn get_balance(&self) -> Result<LedgerBalance, LedgerError> {
        let balance = self.api.get_balance().await.map_err(to_ledger_error)?;
        let available = balance.available.first().map(|b| b.amount).unwrap_or(0);
        Ok(LedgerBalance { available: Cents::from(available) })
    }
}

fn to_ledger_error(e: LedgerApiError) -> LedgerError {
    match e.status() {
        Some(401) | Some(403) => LedgerError::Authentication,
        Some(404) => LedgerError::NotFound(e.to_string()),
        Some(_) => LedgerError::Api(e.to_string()),
        None => LedgerError::Connection(e.to_string()),
    }
}

/// Maps a verified webhook envelope onto the engine's event type. Envelopes without the fields a
/// recognized event needs fall back to `Unrecognized`, which the reconciler acknowledges without
/// acting on.
pub fn ledger_event_from_envelope(envelope: &WebhookEnvelope) -> LedgerEvent {
    let object_id = envelope.object_id().map(str::to_string);
    match (envelope.event_type.as_str(), object_id) {
        (EVENT_CHARGE_SUCCEEDED, Some(charge_id)) => LedgerEvent::ChargeSucceeded { charge_id },
        (EVENT_CHARGE_FAILED, Some(charge_id)) => LedgerEvent::ChargeFailed {
            charge_id,
            message: envelope.field_str("failure_message").map(str::to_string),
        },
        (EVENT_TRANSFER_PAID, Some(transfer_id)) => LedgerEvent::TransferPaid { transfer_id },
        (EVENT_TRANSFER_FAILED, Some(transfer_id)) => LedgerEvent::TransferFailed {
            transfer_id,
            failure_code: envelope.field_str("failure_code").map(str::to_string),
            failure_message: envelope.field_str("failure_message").map(str::to_string),
        },
        (EVENT_TRANSFER_CREATED, Some(transfer_id)) => LedgerEvent::TransferCreated {
            transfer_id,
            amount: Cents::from(envelope.field_i64("amount").unwrap_or(0)),
            destination: envelope.field_str("destination").unwrap_or("unknown").to_string(),
        },
        (event_type, _) => LedgerEvent::Unrecognized { event_type: event_type.to_string() },
    }
}

#[cfg(test)]
mod test {
    use ledger_client::data_objects::WebhookEnvelope;
    use podium_engine::traits::LedgerEvent;
    use serde_json::json;

    use super::ledger_event_from_envelope;

    fn envelope(event_type: &str, data: serde_json::Value) -> WebhookEnvelope {
        WebhookEnvelope { event_type: event_type.to_string(), data }
    }

    #[test]
    fn recognized_events_map_to_engine_events() {
        let ev = ledger_event_from_envelope(&envelope("charge.succeeded", json!({"id": "ch_1"})));
        assert_eq!(ev, LedgerEvent::ChargeSucceeded { charge_id: "ch_1".to_string() });

        let ev = ledger_event_from_envelope(&envelope(
            "transfer.failed",
            json!({"id": "tr_1", "failure_code": "account_closed", "failure_message": "closed"}),
        ));
        assert_eq!(ev, LedgerEvent::TransferFailed {
            transfer_id: "tr_1".to_string(),
            failure_code: Some("account_closed".to_string()),
            failure_message: Some("closed".to_string()),
        });
    }

    #[test]
    fn unknown_and_malformed_events_fall_back_to_unrecognized() {
        let ev = ledger_event_from_envelope(&envelope("charge.refund.updated", json!({"id": "re_1"})));
        assert_eq!(ev, LedgerEvent::Unrecognized { event_type: "charge.refund.updated".to_string() });

        // a recognized type without an object id is also treated as unrecognized
        let ev = ledger_event_from_envelope(&envelope("charge.succeeded", json!({})));
        assert_eq!(ev, LedgerEvent::Unrecognized { event_type: "charge.succeeded".to_string() });
    }
}
