use dotenvy::dotenv;
use log::info;
use podium_engine::events::EventHandlers;
use podium_server::{config::ServerConfig, integrations::notifications, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = ServerConfig::from_env_or_default();

    let hooks = notifications::notification_hooks(config.notification_url.clone());
    let handlers = EventHandlers::new(32, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config, producers).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
