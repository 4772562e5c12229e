//! PostgreSQL prediction store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::feature_extractor::FeatureVector;
use crate::store::{PredictionStore, StoreError};
use crate::types::prediction::Prediction;
use crate::types::transaction::Transaction;

/// Prediction store backed by a PostgreSQL table.
///
/// `transaction_id` is the primary key; the insert uses
/// `ON CONFLICT DO NOTHING` so re-delivered transactions surface as
/// [`StoreError::Duplicate`] instead of a second row.
#[derive(Clone)]
pub struct PgPredictionStore {
    pool: PgPool,
}

impl PgPredictionStore {
    /// Connect to the database and make sure the predictions table exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options =
            PgConnectOptions::from_str(&config.url)?.application_name("fraud_predictor");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        info!(max_connections = config.max_connections, "connected to database");

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fraud_transactions (
                transaction_id    VARCHAR(255) PRIMARY KEY,
                occurred_at       TIMESTAMPTZ NOT NULL,
                amount            DOUBLE PRECISION NOT NULL,
                category          VARCHAR(100),
                merchant          VARCHAR(255),
                gender            VARCHAR(10),
                city_pop          BIGINT,
                lat               DOUBLE PRECISION,
                long              DOUBLE PRECISION,
                features          JSONB,
                fraud_probability DOUBLE PRECISION NOT NULL,
                predicted_fraud   BOOLEAN NOT NULL,
                scored_at         TIMESTAMPTZ NOT NULL,
                created_at        TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("table fraud_transactions is ready");
        Ok(())
    }
}

#[async_trait]
impl PredictionStore for PgPredictionStore {
    async fn record(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        prediction: &Prediction,
    ) -> Result<(), StoreError> {
        // The transaction passed feature derivation, so the timestamp parses;
        // scoring time stands in if this invariant is ever broken.
        let occurred_at = transaction.occurred_at().unwrap_or(prediction.scored_at);

        let result = sqlx::query(
            r#"
            INSERT INTO fraud_transactions
                (transaction_id, occurred_at, amount, category, merchant, gender,
                 city_pop, lat, long, features, fraud_probability, predicted_fraud, scored_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(&transaction.transaction_id)
        .bind(occurred_at)
        .bind(transaction.amount)
        .bind(&transaction.category)
        .bind(&transaction.merchant)
        .bind(&transaction.gender)
        .bind(transaction.city_pop)
        .bind(transaction.lat)
        .bind(transaction.longitude)
        .bind(features.to_json())
        .bind(prediction.fraud_probability)
        .bind(prediction.predicted_fraud)
        .bind(prediction.scored_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(transaction.transaction_id.clone()));
        }

        Ok(())
    }
}
