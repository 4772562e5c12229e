//! Transaction acquisition from the upstream data-serving endpoint.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::SourceConfig;
use crate::types::transaction::Transaction;

/// Errors while acquiring a transaction. All of them are transient from the
/// loop's point of view: log, skip the tick, poll again.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Request failed at the transport level (connect, timeout, HTTP status)
    #[error("transaction request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered but the payload did not decode as a transaction
    #[error("malformed transaction payload: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Provider of transactions, one per call.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_one(&self) -> Result<Transaction, SourceError>;
}

/// HTTP client for the transaction endpoint.
///
/// Each call performs one GET with an explicit request timeout so a stalled
/// endpoint degrades the polling cadence instead of hanging the loop. No
/// internal retries; retry pacing belongs to the predictor loop.
pub struct HttpTransactionSource {
    client: reqwest::Client,
    endpoint: String,
    health_endpoint: Option<String>,
}

impl HttpTransactionSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            health_endpoint: config.health_endpoint.clone(),
        })
    }

    /// Probe the source's liveness endpoint, if one is configured.
    ///
    /// Called once at startup; a dead source is worth a warning but not a
    /// refusal to start, since fetch failures are transient by contract.
    pub async fn probe(&self) -> Result<(), SourceError> {
        let Some(url) = &self.health_endpoint else {
            return Ok(());
        };

        self.client.get(url).send().await?.error_for_status()?;
        info!(endpoint = %url, "transaction source is healthy");
        Ok(())
    }
}

#[async_trait]
impl TransactionSource for HttpTransactionSource {
    async fn fetch_one(&self) -> Result<Transaction, SourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;

        response.json::<Transaction>().await.map_err(SourceError::Decode)
    }
}
