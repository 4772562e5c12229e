//! In-memory prediction store for tests and offline runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::feature_extractor::FeatureVector;
use crate::store::{PredictionStore, StoreError};
use crate::types::prediction::Prediction;
use crate::types::transaction::Transaction;

/// One stored row: the prediction plus its denormalized transaction and the
/// feature values the model saw.
#[derive(Debug, Clone)]
pub struct StoredPrediction {
    pub transaction: Transaction,
    pub features: serde_json::Value,
    pub prediction: Prediction,
}

/// Thread-safe map-backed store with the same idempotence contract as the
/// PostgreSQL gateway.
#[derive(Default)]
pub struct InMemoryPredictionStore {
    rows: RwLock<HashMap<String, StoredPrediction>>,
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn get(&self, transaction_id: &str) -> Option<StoredPrediction> {
        self.rows.read().await.get(transaction_id).cloned()
    }
}

#[async_trait]
impl PredictionStore for InMemoryPredictionStore {
    async fn record(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        prediction: &Prediction,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;

        if rows.contains_key(&transaction.transaction_id) {
            return Err(StoreError::Duplicate(transaction.transaction_id.clone()));
        }

        rows.insert(
            transaction.transaction_id.clone(),
            StoredPrediction {
                transaction: transaction.clone(),
                features: features.to_json(),
                prediction: prediction.clone(),
            },
        );
        Ok(())
    }
}
