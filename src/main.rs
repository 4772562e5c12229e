//! Fraud Prediction Pipeline - Main Entry Point
//!
//! Polls the transaction endpoint, scores each transaction with the loaded
//! model, persists predictions to PostgreSQL, and dispatches fraud alerts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fraud_predictor::{
    config::AppConfig,
    feature_extractor::FeatureExtractor,
    metrics::{MetricsReporter, PipelineMetrics},
    models::OnnxScorer,
    notify::Notifier,
    policy::DecisionPolicy,
    predictor::Predictor,
    source::HttpTransactionSource,
    store::PgPredictionStore,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting fraud prediction pipeline");
    info!(
        endpoint = %config.source.endpoint,
        poll_interval_secs = config.source.poll_interval_secs,
        threshold = config.detection.threshold,
        "Configuration loaded"
    );

    // A dead source is transient by contract; note it and start anyway
    let source = HttpTransactionSource::new(&config.source)
        .context("Failed to build transaction source client")?;
    if let Err(e) = source.probe().await {
        warn!(error = %e, "transaction source health probe failed");
    }

    let extractor = FeatureExtractor::new();
    info!(features = extractor.feature_count(), "Feature extractor initialized");

    // No model, no service
    let scorer = OnnxScorer::load(
        &config.model.path,
        config.model.intra_threads,
        extractor.feature_count(),
    )
    .context("Failed to load scoring model")?;
    info!(path = %config.model.path, "Scoring model loaded");

    let store = PgPredictionStore::connect(&config.database)
        .await
        .context("Failed to initialize prediction store")?;

    let notifier = Notifier::from_config(&config.notifier)
        .context("Failed to build notifier channels")?;
    info!(channels = notifier.channel_count(), "Notifier initialized");

    let metrics = Arc::new(PipelineMetrics::new());

    // Periodic metrics summary every 30 seconds
    let reporter = MetricsReporter::new(metrics.clone(), 30);
    tokio::spawn(reporter.start());

    let predictor = Predictor::new(
        Arc::new(source),
        extractor,
        Arc::new(scorer),
        DecisionPolicy::new(config.detection.threshold),
        Arc::new(store),
        Arc::new(notifier),
        metrics.clone(),
        Duration::from_secs(config.source.poll_interval_secs),
        Duration::from_secs(config.source.retry_delay_secs),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "unable to listen for shutdown signal");
            return;
        }
        info!("stop signal received, finishing current cycle");
        let _ = stop_tx.send(true);
    });

    predictor.run(stop_rx).await;

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
