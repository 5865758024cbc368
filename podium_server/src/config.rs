use std::env;

use ledger_client::LedgerConfig;
use log::*;
use podium_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_POD_HOST: &str = "127.0.0.1";
const DEFAULT_POD_PORT: u16 = 8420;
/// Header carrying the processor's HMAC signature on webhook deliveries.
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Ledger-Signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret for authenticating inbound processor webhooks.
    pub webhook_secret: Secret<String>,
    /// Name of the header the signature arrives in.
    pub signature_header: String,
    /// If false, webhook signature checks are skipped entirely. **Only for local development.**
    pub webhook_signature_checks: bool,
    /// Where the notification service listens; `None` disables outbound notifications.
    pub notification_url: Option<String>,
    /// Processor REST client configuration.
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_POD_HOST.to_string(),
            port: DEFAULT_POD_PORT,
            database_url: String::default(),
            webhook_secret: Secret::default(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            webhook_signature_checks: true,
            notification_url: None,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("POD_HOST").ok().unwrap_or_else(|| DEFAULT_POD_HOST.into());
        let port = env::var("POD_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for POD_PORT. {e} Using the default, {DEFAULT_POD_PORT}, \
                         instead."
                    );
                    DEFAULT_POD_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_POD_PORT);
        let database_url = env::var("POD_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ POD_DATABASE_URL is not set. Please set it to the URL for the Podium database.");
            String::default()
        });
        let ledger = LedgerConfig::new_from_env_or_default();
        let webhook_secret = Secret::new(ledger.webhook_secret.reveal().clone());
        let signature_header =
            env::var("POD_SIGNATURE_HEADER").ok().unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string());
        let webhook_signature_checks =
            parse_boolean_flag(env::var("POD_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !webhook_signature_checks {
            warn!(
                "🪛️ Webhook signature checks are DISABLED. Anyone can post forged settlement events to this \
                 server. Never run with this setting in production."
            );
        }
        let notification_url = env::var("POD_NOTIFICATION_URL").ok();
        Self {
            host,
            port,
            database_url,
            webhook_secret,
            signature_header,
            webhook_signature_checks,
            notification_url,
            ledger,
        }
    }
}
