//! Prediction outcome record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::DecisionPolicy;

/// Outcome of scoring a single transaction.
///
/// Created once per transaction and never mutated; the persistence gateway
/// owns the durable copy. `predicted_fraud` always equals
/// `fraud_probability >= threshold` for the policy in force when the
/// prediction was made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Identifier of the scored transaction (unique key in storage)
    pub transaction_id: String,

    /// Model probability that the transaction is fraudulent, in [0, 1]
    pub fraud_probability: f64,

    /// Verdict after applying the decision threshold
    pub predicted_fraud: bool,

    /// When the score was produced
    pub scored_at: DateTime<Utc>,
}

impl Prediction {
    /// Build a prediction by applying `policy` to a model probability.
    pub fn evaluate(transaction_id: &str, fraud_probability: f64, policy: &DecisionPolicy) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            fraud_probability,
            predicted_fraud: policy.is_fraud(fraud_probability),
            scored_at: Utc::now(),
        }
    }
}
