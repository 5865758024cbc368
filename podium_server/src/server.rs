use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use ledger_client::LedgerApi;
use podium_engine::{events::EventProducers, CompetitionApi, JudgingApi, SettlementApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::processor::ProcessorLedger,
    middleware::SignatureMiddlewareFactory,
    routes::{
        health,
        AssignJudgesRoute,
        CheckPaymentRoute,
        CompetitionPayoutsRoute,
        DeleteCompetitionRoute,
        DistributePrizesRoute,
        EntryChargeRoute,
        LeaderboardRoute,
        MyWinningsRoute,
        ResultsRoute,
        SelectWinnersRoute,
        SubmitScoreRoute,
        TransitionStatusRoute,
    },
    webhook_routes::LedgerWebhookRoute,
};

pub async fn run_server(config: ServerConfig, producers: EventProducers) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let ledger_api =
        LedgerApi::new(config.ledger.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let ledger = ProcessorLedger::new(ledger_api.clone());
        let judging_api = JudgingApi::new(db.clone());
        let lifecycle_api = CompetitionApi::new(db.clone(), producers.clone());
        let settlement_api = SettlementApi::new(db.clone(), ledger);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pod::access_log"))
            .app_data(web::Data::new(judging_api))
            .app_data(web::Data::new(lifecycle_api))
            .app_data(web::Data::new(settlement_api));
        // Routes that require caller identity (role enforcement is per-route)
        let api_scope = web::scope("/api")
            .service(TransitionStatusRoute::<SqliteDatabase>::new())
            .service(DeleteCompetitionRoute::<SqliteDatabase>::new())
            .service(AssignJudgesRoute::<SqliteDatabase>::new())
            .service(SubmitScoreRoute::<SqliteDatabase>::new())
            .service(LeaderboardRoute::<SqliteDatabase>::new())
            .service(ResultsRoute::<SqliteDatabase>::new())
            .service(SelectWinnersRoute::<SqliteDatabase>::new())
            .service(EntryChargeRoute::<SqliteDatabase, ProcessorLedger>::new())
            .service(CheckPaymentRoute::<SqliteDatabase, ProcessorLedger>::new())
            .service(DistributePrizesRoute::<SqliteDatabase, ProcessorLedger>::new())
            .service(CompetitionPayoutsRoute::<SqliteDatabase, ProcessorLedger>::new())
            .service(MyWinningsRoute::<SqliteDatabase, ProcessorLedger>::new());
        // The processor webhook is authenticated by its HMAC signature, not by auth headers
        let webhook_scope = web::scope("/webhook")
            .wrap(SignatureMiddlewareFactory::new(
                &config.signature_header,
                config.webhook_secret.clone(),
                config.webhook_signature_checks,
            ))
            .service(LedgerWebhookRoute::<SqliteDatabase, ProcessorLedger>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
