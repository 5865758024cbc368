use log::*;
use podium_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    /// Base URL of the processor API, e.g. "https://api.processor.example.com".
    pub base_url: String,
    pub api_key: Secret<String>,
    /// Shared secret used to authenticate inbound webhook deliveries.
    pub webhook_secret: Secret<String>,
}

impl LedgerConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("POD_LEDGER_URL").unwrap_or_else(|_| {
            warn!("POD_LEDGER_URL not set, using (probably useless) default");
            "https://api.ledger.localhost".to_string()
        });
        let api_key = Secret::new(std::env::var("POD_LEDGER_API_KEY").unwrap_or_else(|_| {
            warn!("POD_LEDGER_API_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("POD_LEDGER_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("POD_LEDGER_WEBHOOK_SECRET not set, using (probably useless) default");
            "whsec_00000000000000".to_string()
        }));
        Self { base_url, api_key, webhook_secret }
    }
}
