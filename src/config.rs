//! Configuration management for the fraud prediction pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transaction source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Endpoint returning one transaction per GET
    pub endpoint: String,
    /// Liveness probe endpoint, probed once at startup when set
    #[serde(default)]
    pub health_endpoint: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Seconds between polls after a completed cycle
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Shorter delay before the next poll after a failed cycle
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// Scoring model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the frozen ONNX scoring artifact
    pub path: String,
    /// Number of intra-op threads for ONNX inference (default: 1)
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Probability threshold separating fraud from legitimate.
    /// Tuned below the naive 0.5 midpoint for the class-imbalanced model.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// PostgreSQL connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (postgres://...)
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Notification channel configuration. Each channel is independent; leaving
/// one unconfigured disables it without affecting the others.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Structured-log channel (on by default)
    #[serde(default = "default_true")]
    pub log_enabled: bool,
    /// Webhook POST target; channel disabled when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_request_timeout() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    60
}

fn default_retry_delay() -> u64 {
    10
}

fn default_intra_threads() -> usize {
    1
}

fn default_threshold() -> f64 {
    0.4
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_webhook_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl AppConfig {
    /// Load configuration from the default file location, layered with
    /// `FRAUD_PREDICTOR__`-prefixed environment variables
    /// (e.g. `FRAUD_PREDICTOR__DATABASE__URL`).
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FRAUD_PREDICTOR")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            log_enabled: true,
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                endpoint: "http://localhost:5000/transaction".to_string(),
                health_endpoint: Some("http://localhost:5000/health".to_string()),
                request_timeout_secs: default_request_timeout(),
                poll_interval_secs: default_poll_interval(),
                retry_delay_secs: default_retry_delay(),
            },
            model: ModelConfig {
                path: "models/fraud_classifier.onnx".to_string(),
                intra_threads: default_intra_threads(),
            },
            detection: DetectionConfig {
                threshold: default_threshold(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/fraud_detection".to_string(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
            },
            notifier: NotifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
