//! End-to-end pipeline scenarios over stub collaborators.
//!
//! Drives the real predictor loop with a scripted transaction feed, a
//! deterministic scorer, the in-memory store, and a collecting alert
//! channel: no network, no database, no model artifact.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use fraud_predictor::feature_extractor::{FeatureExtractor, FeatureVector};
use fraud_predictor::metrics::PipelineMetrics;
use fraud_predictor::models::{ModelError, Scorer};
use fraud_predictor::notify::{AlertChannel, Notifier};
use fraud_predictor::policy::DecisionPolicy;
use fraud_predictor::predictor::{CycleOutcome, Predictor};
use fraud_predictor::source::{SourceError, TransactionSource};
use fraud_predictor::store::{InMemoryPredictionStore, PredictionStore, StoreError};
use fraud_predictor::types::alert::FraudAlert;
use fraud_predictor::types::prediction::Prediction;
use fraud_predictor::types::transaction::Transaction;

/// Scripted feed; reports the source as down once exhausted.
struct ScriptedSource {
    feed: Mutex<VecDeque<Transaction>>,
}

impl ScriptedSource {
    fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            feed: Mutex::new(transactions.into()),
        }
    }
}

#[async_trait]
impl TransactionSource for ScriptedSource {
    async fn fetch_one(&self) -> Result<Transaction, SourceError> {
        match self.feed.lock().await.pop_front() {
            Some(tx) => Ok(tx),
            None => {
                let err = reqwest::Client::new()
                    .get("http://")
                    .send()
                    .await
                    .unwrap_err();
                Err(SourceError::Transport(err))
            }
        }
    }
}

/// Deterministic scorer: anything over 1000 units looks fraudulent.
struct AmountScorer;

impl Scorer for AmountScorer {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let amount = features.values()[0];
        Ok(if amount > 1000.0 { 0.62 } else { 0.03 })
    }
}

/// Store that rejects the first `outages` writes with a storage error.
struct FlakyStore {
    inner: Arc<InMemoryPredictionStore>,
    outages: AtomicUsize,
}

#[async_trait]
impl PredictionStore for FlakyStore {
    async fn record(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        prediction: &Prediction,
    ) -> Result<(), StoreError> {
        if self.outages.load(Ordering::SeqCst) > 0 {
            self.outages.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Storage(sqlx::Error::PoolTimedOut));
        }
        self.inner.record(transaction, features, prediction).await
    }
}

struct CollectingChannel {
    alerts: Arc<Mutex<Vec<FraudAlert>>>,
}

#[async_trait]
impl AlertChannel for CollectingChannel {
    fn name(&self) -> &'static str {
        "collecting"
    }

    async fn deliver(&self, alert: &FraudAlert) -> AnyResult<()> {
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }
}

fn shopping_net(id: &str, amount: f64) -> Transaction {
    let mut tx = Transaction::new(id, amount, "2020-06-21 02:14:25");
    tx.category = "shopping_net".to_string();
    tx
}

fn grocery_pos(id: &str, amount: f64) -> Transaction {
    let mut tx = Transaction::new(id, amount, "2020-06-17 14:30:00");
    tx.category = "grocery_pos".to_string();
    tx
}

fn build_predictor(
    transactions: Vec<Transaction>,
    store: Arc<dyn PredictionStore>,
) -> (Predictor, Arc<Mutex<Vec<FraudAlert>>>) {
    let alerts = Arc::new(Mutex::new(Vec::new()));
    let notifier = Arc::new(Notifier::new(vec![Box::new(CollectingChannel {
        alerts: alerts.clone(),
    })]));

    let predictor = Predictor::new(
        Arc::new(ScriptedSource::new(transactions)),
        FeatureExtractor::new(),
        Arc::new(AmountScorer),
        DecisionPolicy::new(0.4),
        store,
        notifier,
        Arc::new(PipelineMetrics::new()),
        Duration::from_millis(5),
        Duration::from_millis(5),
    );
    (predictor, alerts)
}

#[tokio::test]
async fn fraud_transaction_is_persisted_and_alerted_once() {
    let store = Arc::new(InMemoryPredictionStore::new());
    let (predictor, alerts) =
        build_predictor(vec![shopping_net("T1", 4200.00)], store.clone());

    let outcome = predictor.run_cycle().await;
    let CycleOutcome::Completed(report) = outcome else {
        panic!("expected a completed cycle, got {outcome:?}");
    };

    assert_eq!(report.fraud_probability, 0.62);
    assert!(report.predicted_fraud);

    let row = store.get("T1").await.expect("prediction should be stored");
    assert_eq!(row.prediction.fraud_probability, 0.62);
    assert!(row.prediction.predicted_fraud);
    assert_eq!(row.transaction.amount, 4200.00);

    let alerts = alerts.lock().await;
    assert_eq!(alerts.len(), 1, "exactly one notification attempted");
    assert_eq!(alerts[0].transaction_id, "T1");
    assert_eq!(alerts[0].fraud_probability, 0.62);
}

#[tokio::test]
async fn legitimate_transaction_is_persisted_without_alert() {
    let store = Arc::new(InMemoryPredictionStore::new());
    let (predictor, alerts) = build_predictor(vec![grocery_pos("T2", 12.50)], store.clone());

    let outcome = predictor.run_cycle().await;
    let CycleOutcome::Completed(report) = outcome else {
        panic!("expected a completed cycle, got {outcome:?}");
    };

    assert_eq!(report.fraud_probability, 0.03);
    assert!(!report.predicted_fraud);

    let row = store.get("T2").await.expect("prediction should be stored");
    assert!(!row.prediction.predicted_fraud);
    assert!(alerts.lock().await.is_empty(), "zero notifications expected");
}

#[tokio::test]
async fn redelivered_transaction_is_stored_once() {
    let store = Arc::new(InMemoryPredictionStore::new());
    let (predictor, _alerts) = build_predictor(
        vec![grocery_pos("T3", 20.0), grocery_pos("T3", 20.0)],
        store.clone(),
    );

    let CycleOutcome::Completed(first) = predictor.run_cycle().await else {
        panic!("expected a completed cycle");
    };
    let CycleOutcome::Completed(second) = predictor.run_cycle().await else {
        panic!("expected a completed cycle");
    };

    assert!(!first.duplicate);
    assert!(second.duplicate);
    assert!(second.persisted, "duplicate counts as processed");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn storage_outage_is_contained_to_its_cycle() {
    let inner = Arc::new(InMemoryPredictionStore::new());
    let store = Arc::new(FlakyStore {
        inner: inner.clone(),
        outages: AtomicUsize::new(1),
    });
    let (predictor, alerts) = build_predictor(
        vec![shopping_net("T4", 2000.0), grocery_pos("T5", 8.0)],
        store,
    );

    let CycleOutcome::Completed(first) = predictor.run_cycle().await else {
        panic!("expected a completed cycle");
    };
    assert!(!first.persisted, "outage loses this cycle's prediction");
    // alerting still ran for the positive verdict
    assert_eq!(alerts.lock().await.len(), 1);

    let CycleOutcome::Completed(second) = predictor.run_cycle().await else {
        panic!("expected a completed cycle");
    };
    assert!(second.persisted);
    assert!(inner.get("T5").await.is_some());
    assert!(inner.get("T4").await.is_none());
}

#[tokio::test]
async fn malformed_transactions_never_reach_the_store() {
    let store = Arc::new(InMemoryPredictionStore::new());
    let mut negative = grocery_pos("T6", 10.0);
    negative.amount = -5.0;
    let mut no_timestamp = grocery_pos("T7", 10.0);
    no_timestamp.timestamp = String::new();

    let (predictor, alerts) = build_predictor(vec![negative, no_timestamp], store.clone());

    assert!(matches!(
        predictor.run_cycle().await,
        CycleOutcome::Rejected { .. }
    ));
    assert!(matches!(
        predictor.run_cycle().await,
        CycleOutcome::Rejected { .. }
    ));

    assert!(store.is_empty().await);
    assert!(alerts.lock().await.is_empty());
}

#[tokio::test]
async fn loop_processes_stream_and_honors_stop_signal() {
    let store = Arc::new(InMemoryPredictionStore::new());
    let (predictor, alerts) = build_predictor(
        vec![
            shopping_net("S1", 4200.0),
            grocery_pos("S2", 12.5),
            grocery_pos("S3", 30.0),
        ],
        store.clone(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { predictor.run(stop_rx).await });

    // enough ticks for the scripted feed to drain
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop should stop promptly after the signal")
        .unwrap();

    assert_eq!(store.len().await, 3);
    assert_eq!(alerts.lock().await.len(), 1);
    assert!(store.get("S1").await.unwrap().prediction.predicted_fraud);
    assert!(!store.get("S2").await.unwrap().prediction.predicted_fraud);
}
