//! Performance counters and statistics for the prediction pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline activity.
pub struct PipelineMetrics {
    /// Transactions scored end to end
    pub transactions_scored: AtomicU64,
    /// Alerts raised (positive verdicts)
    pub alerts_raised: AtomicU64,
    /// Cycles skipped because the fetch failed
    pub fetch_failures: AtomicU64,
    /// Transactions rejected as malformed
    pub rejected: AtomicU64,
    /// Scoring failures (internal contract violations)
    pub scoring_failures: AtomicU64,
    /// Predictions lost to storage outages
    pub storage_failures: AtomicU64,
    /// Re-delivered transactions absorbed as duplicates
    pub duplicates: AtomicU64,
    /// Probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Cycle times in microseconds
    cycle_times: RwLock<Vec<u64>>,
    /// Start time for throughput calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            scoring_failures: AtomicU64::new(0),
            storage_failures: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            score_buckets: RwLock::new([0; 10]),
            cycle_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction.
    pub fn record_scored(&self, cycle_time: Duration, probability: f64) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.cycle_times.write() {
            times.push(cycle_time.as_micros() as u64);
            // keep only recent samples
            if times.len() > 10_000 {
                times.drain(0..5_000);
            }
        }

        let bucket = (probability * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_alert(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scoring_failure(&self) {
        self.scoring_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Cycle time statistics over the recent sample window.
    pub fn get_cycle_stats(&self) -> CycleStats {
        let times = match self.cycle_times.read() {
            Ok(times) if !times.is_empty() => times,
            _ => return CycleStats::default(),
        };

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        CycleStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Transactions scored per second since startup.
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Log a summary of everything seen so far.
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let alerts = self.alerts_raised.load(Ordering::Relaxed);
        let alert_rate = if scored > 0 {
            (alerts as f64 / scored as f64) * 100.0
        } else {
            0.0
        };
        let stats = self.get_cycle_stats();

        info!(
            transactions_scored = scored,
            alerts_raised = alerts,
            alert_rate = format!("{alert_rate:.1}%"),
            fetch_failures = self.fetch_failures.load(Ordering::Relaxed),
            rejected = self.rejected.load(Ordering::Relaxed),
            scoring_failures = self.scoring_failures.load(Ordering::Relaxed),
            storage_failures = self.storage_failures.load(Ordering::Relaxed),
            duplicates = self.duplicates.load(Ordering::Relaxed),
            throughput = format!("{:.2} tx/s", self.get_throughput()),
            cycle_mean_us = stats.mean_us,
            cycle_p95_us = stats.p95_us,
            "pipeline summary"
        );

        let distribution = self.get_score_distribution();
        let total: u64 = distribution.iter().sum();
        if total > 0 {
            for (i, &count) in distribution.iter().enumerate() {
                let pct = (count as f64 / total as f64) * 100.0;
                info!(
                    bucket = format!("{:.1}-{:.1}", i as f64 / 10.0, (i + 1) as f64 / 10.0),
                    count,
                    pct = format!("{pct:.1}%"),
                    "score distribution"
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Cycle time statistics
#[derive(Debug, Default)]
pub struct CycleStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}

/// Periodically logs the metrics summary while the pipeline runs.
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task.
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.tick().await; // immediate first tick carries no data
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
