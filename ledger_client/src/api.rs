use std::{collections::HashMap, sync::Arc};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::LedgerConfig,
    data_objects::{BalanceResponse, ChargeResponse, NewChargeRequest, NewTransferRequest, TransferResponse},
    LedgerApiError,
};

/// Header the processor uses to deduplicate replayed requests.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct LedgerApi {
    config: LedgerConfig,
    client: Arc<Client>,
}

impl LedgerApi {
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| LedgerApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
        idempotency_key: Option<&str>,
    ) -> Result<T, LedgerApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| LedgerApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| LedgerApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| LedgerApiError::RestResponseError(e.to_string()))?;
            Err(LedgerApiError::QueryError { status, message })
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Creates a charge intent. `amount` is in minor currency units.
    pub async fn create_charge(
        &self,
        amount: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<ChargeResponse, LedgerApiError> {
        debug!("Creating charge intent for {amount} {currency}");
        let body = NewChargeRequest { amount, currency: currency.to_string(), metadata };
        let charge = self.rest_query::<ChargeResponse, _>(Method::POST, "/charges", Some(body), None).await?;
        info!("Created charge intent {}", charge.id);
        Ok(charge)
    }

    pub async fn get_charge(&self, charge_id: &str) -> Result<ChargeResponse, LedgerApiError> {
        let path = format!("/charges/{charge_id}");
        debug!("Fetching charge {charge_id}");
        self.rest_query::<ChargeResponse, ()>(Method::GET, &path, None, None).await
    }

    /// Creates an outbound transfer. The idempotency key is forwarded in the
    /// `Idempotency-Key` header so that retried and replayed calls do not create duplicates.
    pub async fn create_transfer(
        &self,
        amount: i64,
        currency: &str,
        destination: &str,
        idempotency_key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<TransferResponse, LedgerApiError> {
        debug!("Creating transfer of {amount} {currency} to {destination}");
        let body = NewTransferRequest {
            amount,
            currency: currency.to_string(),
            destination: destination.to_string(),
            metadata,
        };
        let transfer = self
            .rest_query::<TransferResponse, _>(Method::POST, "/transfers", Some(body), Some(idempotency_key))
            .await?;
        info!("Created transfer {}", transfer.id);
        Ok(transfer)
    }

    pub async fn get_balance(&self) -> Result<BalanceResponse, LedgerApiError> {
        debug!("Fetching platform balance");
        self.rest_query::<BalanceResponse, ()>(Method::GET, "/balance", None, None).await
    }
}
