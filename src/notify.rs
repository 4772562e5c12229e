//! Best-effort alert delivery over independent channels.
//!
//! Every configured channel gets each alert; a failure on one channel never
//! blocks the others, and delivery failure never escalates past a log line.
//! Alerting must not become the bottleneck of detection throughput.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::NotifierConfig;
use crate::types::alert::FraudAlert;

/// Some channels failed while others may have delivered. Informational: the
/// loop logs it and moves on.
#[derive(Debug, Error)]
#[error("alert delivery degraded: {} of {attempted} channels failed ({failed:?})", failed.len())]
pub struct PartialDelivery {
    /// How many channels were attempted
    pub attempted: usize,
    /// Names of the channels that failed
    pub failed: Vec<String>,
}

/// A single delivery channel for fraud alerts.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, alert: &FraudAlert) -> Result<()>;
}

/// Channel that writes the alert to the structured log at warn level.
/// Durable as long as the process log is; always succeeds.
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, alert: &FraudAlert) -> Result<()> {
        warn!(
            alert_id = %alert.alert_id,
            transaction_id = %alert.transaction_id,
            amount = alert.amount,
            category = %alert.category,
            merchant = %alert.merchant,
            fraud_probability = alert.fraud_probability,
            occurred_at = %alert.occurred_at,
            "FRAUD ALERT"
        );
        Ok(())
    }
}

/// Channel that POSTs the alert as JSON to a configured webhook.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, alert: &FraudAlert) -> Result<()> {
        self.client
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook rejected alert")?;
        Ok(())
    }
}

/// Fans one alert out to all configured channels.
pub struct Notifier {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl Notifier {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    /// Build the channel set from configuration. Absent configuration for a
    /// channel disables that channel without affecting the others.
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();

        if config.log_enabled {
            channels.push(Box::new(LogChannel));
        }
        if let Some(url) = &config.webhook_url {
            let timeout = Duration::from_secs(config.webhook_timeout_secs);
            channels.push(Box::new(WebhookChannel::new(url, timeout)?));
        }

        Ok(Self::new(channels))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Attempt delivery on every channel, collecting per-channel failures.
    pub async fn dispatch(&self, alert: &FraudAlert) -> Result<(), PartialDelivery> {
        let attempts = self.channels.iter().map(|channel| async move {
            let outcome = channel.deliver(alert).await;
            (channel.name(), outcome)
        });

        let mut failed = Vec::new();
        for (name, outcome) in futures::future::join_all(attempts).await {
            match outcome {
                Ok(()) => {
                    debug!(channel = name, alert_id = %alert.alert_id, "alert delivered");
                }
                Err(e) => {
                    warn!(channel = name, alert_id = %alert.alert_id, error = %format!("{e:#}"), "alert delivery failed");
                    failed.push(name.to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(PartialDelivery {
                attempted: self.channels.len(),
                failed,
            })
        }
    }
}
