//! Fraud alert data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::prediction::Prediction;
use crate::types::transaction::Transaction;

/// Alert raised when a transaction crosses the fraud threshold.
///
/// Ephemeral: built from a positive prediction, handed to the notifier
/// channels, never persisted on its own. Carries enough denormalized
/// transaction detail for a human to triage without a database lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Associated transaction ID
    pub transaction_id: String,

    /// Model probability that triggered the alert (0.0 - 1.0)
    pub fraud_probability: f64,

    /// Decision threshold in force when the alert was raised
    pub threshold: f64,

    /// Transaction amount
    pub amount: f64,

    /// Merchant category
    pub category: String,

    /// Merchant name
    pub merchant: String,

    /// Transaction timestamp as delivered by the feed
    pub occurred_at: String,

    /// When the transaction was scored
    pub scored_at: DateTime<Utc>,
}

impl FraudAlert {
    /// Build an alert from a positive prediction and its transaction.
    pub fn from_prediction(transaction: &Transaction, prediction: &Prediction, threshold: f64) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction.transaction_id.clone(),
            fraud_probability: prediction.fraud_probability,
            threshold,
            amount: transaction.amount,
            category: transaction.category.clone(),
            merchant: transaction.merchant.clone(),
            occurred_at: transaction.timestamp.clone(),
            scored_at: prediction.scored_at,
        }
    }
}
