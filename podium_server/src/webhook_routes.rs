//----------------------------------------------   Webhooks  ----------------------------------------------------
//
// The processor's webhook deliveries land here, after the signature middleware has authenticated
// them. From that point on the endpoint always answers 200: a non-2xx would make the processor
// redeliver the event, and redelivery is not idempotency-safe for every failure mode on this
// path. Processing failures are logged with a `reconciliation-pending` marker instead, and the
// client-poll path picks up whatever a swallowed failure left behind.

use actix_web::{web, HttpRequest, HttpResponse};
use ledger_client::data_objects::WebhookEnvelope;
use log::*;
use podium_engine::{MoneyLedger, SettlementApi, SettlementDatabase};

use crate::{data_objects::JsonResponse, integrations::processor::ledger_event_from_envelope, route};

route!(ledger_webhook => Post "/ledger" impl SettlementDatabase, MoneyLedger);
pub async fn ledger_webhook<B, L>(
    req: HttpRequest,
    body: web::Json<WebhookEnvelope>,
    api: web::Data<SettlementApi<B, L>>,
) -> HttpResponse
where
    B: SettlementDatabase,
    L: MoneyLedger,
{
    trace!("🔔️ Received webhook request: {}", req.uri());
    let envelope = body.into_inner();
    info!("🔔️ Received processor event: {}", envelope.event_type);
    let event = ledger_event_from_envelope(&envelope);
    // Webhook responses must always be 200 once the signature passed, otherwise the processor
    // will retry the delivery
    let result = match api.handle_ledger_event(event).await {
        Ok(()) => JsonResponse::success("Event processed."),
        Err(e) => {
            error!(
                "🔔️ reconciliation-pending: processing of event '{}' failed and was absorbed. {e}",
                envelope.event_type
            );
            JsonResponse::failure(e.to_string())
        },
    };
    HttpResponse::Ok().json(result)
}
