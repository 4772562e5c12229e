//! Prediction persistence.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::feature_extractor::FeatureVector;
use crate::types::prediction::Prediction;
use crate::types::transaction::Transaction;

pub use memory::InMemoryPredictionStore;
pub use postgres::PgPredictionStore;

/// Failures while recording a prediction.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A prediction for this transaction identity already exists. Not a
    /// failure: re-delivery from the feed is treated as idempotent.
    #[error("prediction for transaction {0} already recorded")]
    Duplicate(String),

    /// The write failed for reasons unrelated to duplication (connectivity,
    /// unrelated constraint). The cycle is lost; the loop goes on.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Durable, idempotent store of predictions keyed by transaction identity.
///
/// The gateway never retries internally; retry policy belongs to the caller.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Record one prediction together with the transaction it was derived
    /// from and the feature values the model saw.
    async fn record(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        prediction: &Prediction,
    ) -> Result<(), StoreError>;
}
