use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use podium_common::Secret;
use podium_engine::{db_types::Role, SettlementApi, SqliteDatabase};

use super::helpers::{test_db, NullLedger};
use crate::{
    config::DEFAULT_SIGNATURE_HEADER,
    helpers::calculate_hmac,
    middleware::SignatureMiddlewareFactory,
    routes::LeaderboardRoute,
    webhook_routes::LedgerWebhookRoute,
    auth::{ROLES_HEADER, USER_HEADER},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

async fn post_webhook(body: &str, signature: Option<&str>) -> Result<(StatusCode, String), String> {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let api = SettlementApi::new(db, NullLedger);
    let app = App::new().app_data(web::Data::new(api)).service(
        web::scope("/webhook")
            .wrap(SignatureMiddlewareFactory::new(
                DEFAULT_SIGNATURE_HEADER,
                Secret::new(WEBHOOK_SECRET.to_string()),
                true,
            ))
            .service(LedgerWebhookRoute::<SqliteDatabase, NullLedger>::new()),
    );
    let service = test::init_service(app).await;
    let mut req = TestRequest::post()
        .uri("/webhook/ledger")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header((DEFAULT_SIGNATURE_HEADER, sig));
    }
    let (_, res) =
        test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

#[actix_web::test]
async fn webhook_without_signature_is_rejected() {
    let body = r#"{"type":"charge.succeeded","data":{"id":"ch_1"}}"#;
    let err = post_webhook(body, None).await.expect_err("Expected the request to be rejected");
    assert_eq!(err, "No webhook signature found.");
}

#[actix_web::test]
async fn webhook_with_wrong_signature_is_rejected() {
    let body = r#"{"type":"charge.succeeded","data":{"id":"ch_1"}}"#;
    let bad_signature = calculate_hmac("wrong_secret", body.as_bytes());
    let err = post_webhook(body, Some(&bad_signature)).await.expect_err("Expected the request to be rejected");
    assert_eq!(err, "Invalid webhook signature.");
}

#[actix_web::test]
async fn unknown_events_are_acknowledged_with_200() {
    let body = r#"{"type":"charge.refund.updated","data":{"id":"re_1"}}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    let (status, body) = post_webhook(body, Some(&signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":true"), "unexpected body: {body}");
}

#[actix_web::test]
async fn processing_failures_are_absorbed_and_still_acknowledged() {
    // a succeeded charge the system has never heard of: processing logs and drops it
    let body = r#"{"type":"charge.succeeded","data":{"id":"ch_unseen"}}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    let (status, _) = post_webhook(body, Some(&signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn acl_distinguishes_roles_before_handlers_run() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let api = podium_engine::JudgingApi::new(db);
    let app = App::new()
        .app_data(web::Data::new(api))
        .service(web::scope("/api").service(LeaderboardRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;

    // a judge may not read the operational leaderboard
    let req = TestRequest::get()
        .uri("/api/competitions/1/leaderboard")
        .insert_header((USER_HEADER, "501"))
        .insert_header((ROLES_HEADER, Role::Judge.to_string()))
        .to_request();
    let err = test::try_call_service(&service, req).await.expect_err("Expected a 403").to_string();
    assert_eq!(err, "Insufficient permissions");

    // an admin passes the ACL and reaches the handler, which 404s on the unknown competition
    let req = TestRequest::get()
        .uri("/api/competitions/1/leaderboard")
        .insert_header((USER_HEADER, "1"))
        .insert_header((ROLES_HEADER, Role::Admin.to_string()))
        .to_request();
    let err = test::try_call_service(&service, req).await.expect_err("Expected a 404").to_string();
    assert_eq!(err, "The data was not found. competition 1");
}
