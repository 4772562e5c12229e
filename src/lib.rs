//! Fraud Prediction Pipeline Library
//!
//! Real-time fraud scoring: polls a transaction endpoint, derives features,
//! scores with a pre-trained classifier, persists predictions idempotently,
//! and raises best-effort alerts above the decision threshold.

pub mod config;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod policy;
pub mod predictor;
pub mod source;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use models::{OnnxScorer, Scorer};
pub use notify::Notifier;
pub use policy::DecisionPolicy;
pub use predictor::Predictor;
pub use source::{HttpTransactionSource, TransactionSource};
pub use store::{PgPredictionStore, PredictionStore};
pub use types::{FraudAlert, Prediction, Transaction};
