//! The prediction loop: acquire, derive, score, decide, persist, notify.
//!
//! One logical worker drives one transaction at a time through the whole
//! pipeline. Every failure inside a cycle is contained within that cycle;
//! the loop itself only stops on the external stop signal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::feature_extractor::FeatureExtractor;
use crate::metrics::PipelineMetrics;
use crate::models::Scorer;
use crate::notify::Notifier;
use crate::policy::DecisionPolicy;
use crate::source::TransactionSource;
use crate::store::{PredictionStore, StoreError};
use crate::types::alert::FraudAlert;
use crate::types::prediction::Prediction;

/// What happened in one pass of the loop.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The source could not produce a transaction; transient, tick skipped
    FetchFailed,
    /// The transaction could not be turned into model input
    Rejected { transaction_id: String },
    /// The scorer failed on well-formed input; should not occur
    ScoringFailed { transaction_id: String },
    /// The transaction made it through scoring and decision
    Completed(CycleReport),
}

/// Details of a completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub transaction_id: String,
    pub fraud_probability: f64,
    pub predicted_fraud: bool,
    /// False only when storage failed; a duplicate counts as persisted
    pub persisted: bool,
    /// The store already had a prediction for this transaction
    pub duplicate: bool,
    /// All notification channels accepted the alert
    pub alert_delivered: bool,
}

impl CycleOutcome {
    /// Failed cycles poll again after the shorter retry delay.
    pub fn is_failure(&self) -> bool {
        !matches!(self, CycleOutcome::Completed(_))
    }
}

/// Orchestrates the fetch → derive → score → decide → persist → notify
/// cycle and owns the polling cadence.
pub struct Predictor {
    source: Arc<dyn TransactionSource>,
    extractor: FeatureExtractor,
    scorer: Arc<dyn Scorer>,
    policy: DecisionPolicy,
    store: Arc<dyn PredictionStore>,
    notifier: Arc<Notifier>,
    metrics: Arc<PipelineMetrics>,
    poll_interval: Duration,
    retry_delay: Duration,
}

impl Predictor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn TransactionSource>,
        extractor: FeatureExtractor,
        scorer: Arc<dyn Scorer>,
        policy: DecisionPolicy,
        store: Arc<dyn PredictionStore>,
        notifier: Arc<Notifier>,
        metrics: Arc<PipelineMetrics>,
        poll_interval: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            source,
            extractor,
            scorer,
            policy,
            store,
            notifier,
            metrics,
            poll_interval,
            retry_delay,
        }
    }

    /// Run one complete cycle. Never returns an error: every failure mode
    /// maps to an outcome and the decision to keep going belongs to `run`.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let started = Instant::now();

        let tx = match self.source.fetch_one().await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "failed to fetch transaction, skipping tick");
                self.metrics.record_fetch_failure();
                return CycleOutcome::FetchFailed;
            }
        };

        let features = match self.extractor.derive(&tx) {
            Ok(features) => features,
            Err(e) => {
                warn!(
                    transaction_id = %tx.transaction_id,
                    error = %e,
                    "rejected malformed transaction"
                );
                self.metrics.record_rejected();
                return CycleOutcome::Rejected {
                    transaction_id: tx.transaction_id,
                };
            }
        };

        let probability = match self.scorer.predict_probability(&features) {
            Ok(p) => p,
            Err(e) => {
                // Derivation produces fixed-shape vectors, so this path is an
                // internal contract violation worth the elevated severity.
                error!(
                    transaction_id = %tx.transaction_id,
                    error = %e,
                    "scoring failed on well-formed input"
                );
                self.metrics.record_scoring_failure();
                return CycleOutcome::ScoringFailed {
                    transaction_id: tx.transaction_id,
                };
            }
        };

        let prediction = Prediction::evaluate(&tx.transaction_id, probability, &self.policy);

        let short_id: String = tx.transaction_id.chars().take(8).collect();
        info!(
            transaction_id = %short_id,
            amount = format!("{:.2}", tx.amount),
            probability = format!("{:.4}", probability),
            verdict = if prediction.predicted_fraud { "FRAUD" } else { "LEGITIMATE" },
            "transaction scored"
        );

        let (persisted, duplicate) = match self.store.record(&tx, &features, &prediction).await {
            Ok(()) => {
                debug!(transaction_id = %tx.transaction_id, "prediction stored");
                (true, false)
            }
            Err(StoreError::Duplicate(id)) => {
                debug!(transaction_id = %id, "already recorded, treating as processed");
                self.metrics.record_duplicate();
                (true, true)
            }
            Err(e) => {
                warn!(
                    transaction_id = %tx.transaction_id,
                    error = %e,
                    "prediction not persisted this cycle"
                );
                self.metrics.record_storage_failure();
                (false, false)
            }
        };

        // Persistence is committed (or abandoned) by this point; alerting
        // can only degrade, never roll anything back.
        let mut alert_delivered = false;
        if prediction.predicted_fraud {
            let alert = FraudAlert::from_prediction(&tx, &prediction, self.policy.threshold());
            self.metrics.record_alert();

            match self.notifier.dispatch(&alert).await {
                Ok(()) => alert_delivered = true,
                Err(e) => {
                    warn!(alert_id = %alert.alert_id, error = %e, "alert delivery degraded");
                }
            }
        }

        self.metrics.record_scored(started.elapsed(), probability);

        CycleOutcome::Completed(CycleReport {
            transaction_id: prediction.transaction_id,
            fraud_probability: probability,
            predicted_fraud: prediction.predicted_fraud,
            persisted,
            duplicate,
            alert_delivered,
        })
    }

    /// Drive cycles until the stop signal fires.
    ///
    /// A cycle runs immediately, then the loop sleeps: the poll interval
    /// after a completed cycle, the retry delay after a failed one. The stop
    /// signal is honored while sleeping and re-checked before each cycle; a
    /// started cycle always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            retry_delay_secs = self.retry_delay.as_secs(),
            threshold = self.policy.threshold(),
            "prediction loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_cycle().await;
            let delay = if outcome.is_failure() {
                self.retry_delay
            } else {
                self.poll_interval
            };

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("prediction loop stopped");
    }
}
