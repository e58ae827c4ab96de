//! Central metrics collector.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::metrics::recorder::LatencyRecorder;
use crate::metrics::snapshot::{MetricsSnapshot, DEFAULT_PERCENTILES};
use crate::metrics::window::RecentWindow;
use crate::metrics::{ExecutionRecord, MetricsProvider};

/// Accepts the high-frequency stream of execution records and produces
/// [`MetricsSnapshot`]s on demand.
///
/// All write paths are a handful of atomic increments plus one short
/// histogram lock; none of them block dispatch. The snapshot path is
/// O(number of percentile keys).
pub struct MetricsCollector {
    started: Instant,
    percentiles: Vec<f64>,

    total_executions: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    dropped_count: AtomicU64,
    rejected_count: AtomicU64,
    queue_size: AtomicU64,

    success_latency: LatencyRecorder,
    failure_latency: LatencyRecorder,
    queue_wait: LatencyRecorder,
    recent: RecentWindow,
}

impl MetricsCollector {
    /// Creates a collector with the default percentile keys
    /// ({0.5, 0.9, 0.95, 0.99}).
    pub fn new() -> Self {
        Self::with_percentiles(DEFAULT_PERCENTILES.to_vec())
            .expect("default percentiles are valid")
    }

    /// Creates a collector reporting the given percentile keys. Keys must
    /// lie in `(0, 1]`.
    pub fn with_percentiles(mut percentiles: Vec<f64>) -> Result<Self> {
        if percentiles.is_empty() {
            return Err(Error::config("percentile set must not be empty"));
        }
        for &q in &percentiles {
            if !(q > 0.0 && q <= 1.0) {
                return Err(Error::config(format!(
                    "percentile keys must be in (0, 1], got {}",
                    q
                )));
            }
        }
        percentiles.sort_by(|a, b| a.partial_cmp(b).expect("keys are finite"));
        percentiles.dedup();

        Ok(Self {
            started: Instant::now(),
            percentiles,
            total_executions: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            queue_size: AtomicU64::new(0),
            success_latency: LatencyRecorder::new(),
            failure_latency: LatencyRecorder::new(),
            queue_wait: LatencyRecorder::new(),
            recent: RecentWindow::new(),
        })
    }

    fn now_sec(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Accounts a submission handed to a worker. The difference between this
    /// counter and the completion counters is the in-flight count.
    pub fn record_submitted(&self) {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed execution.
    pub fn record(&self, record: &ExecutionRecord) {
        let failed = !record.outcome.is_success();
        if failed {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            self.failure_latency.record_ns(record.latency_ns());
        } else {
            self.success_count.fetch_add(1, Ordering::Relaxed);
            self.success_latency.record_ns(record.latency_ns());
        }
        self.queue_wait.record_ns(record.queue_wait_ns());
        self.recent.record(self.now_sec(), failed);
    }

    /// Accounts a submission dropped by backpressure. Dropped work is
    /// counted but never recorded as a failure.
    pub fn record_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Accounts a submission rejected by backpressure (counter only; the
    /// synthetic failure is a separate, suppressible record).
    pub fn record_rejected(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the synthetic failure for a rejected submission. The work was
    /// never dispatched, so this accounts both the submission and its
    /// failure; no latency sample is produced.
    pub fn record_rejection_failure(&self) {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.recent.record(self.now_sec(), true);
    }

    /// Records the failure of an already-submitted execution cancelled
    /// during forced shutdown. No latency sample is produced.
    pub fn record_cancelled(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.recent.record(self.now_sec(), true);
    }

    /// Updates the pending-work gauge.
    pub fn update_queue_size(&self, size: u64) {
        self.queue_size.store(size, Ordering::Relaxed);
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Current pending-work gauge value.
    pub fn queue_size(&self) -> u64 {
        self.queue_size.load(Ordering::Relaxed)
    }

    /// Takes an immutable point-in-time view of all metrics.
    ///
    /// Side-effect free: taking a snapshot never perturbs counters or
    /// histograms.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed = self.started.elapsed();
        let elapsed_secs = elapsed.as_secs_f64();

        let success = self.success_count.load(Ordering::Relaxed);
        let failure = self.failure_count.load(Ordering::Relaxed);
        let rate = |count: u64| {
            if elapsed_secs > 0.0 {
                (count as f64 / elapsed_secs).max(0.0)
            } else {
                0.0
            }
        };

        MetricsSnapshot {
            total_executions: self.total_executions.load(Ordering::Relaxed),
            success_count: success,
            failure_count: failure,
            dropped_count: self.dropped_count.load(Ordering::Relaxed),
            rejected_count: self.rejected_count.load(Ordering::Relaxed),
            queue_size: self.queue_size.load(Ordering::Relaxed),
            elapsed_ms: elapsed.as_millis() as u64,
            success_tps: rate(success),
            failure_tps: rate(failure),
            response_tps: rate(success + failure),
            success_latency: self.success_latency.summary(&self.percentiles),
            failure_latency: self.failure_latency.summary(&self.percentiles),
            queue_wait: self.queue_wait.summary(&self.percentiles),
            adaptive: None,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for MetricsCollector {
    fn failure_rate(&self) -> f64 {
        let success = self.success_count.load(Ordering::Relaxed);
        let failure = self.failure_count.load(Ordering::Relaxed);
        let completed = success + failure;
        if completed == 0 {
            0.0
        } else {
            failure as f64 / completed as f64 * 100.0
        }
    }

    fn recent_failure_rate(&self, window_secs: u64) -> f64 {
        self.recent
            .failure_rate_percent(self.now_sec(), window_secs)
            .unwrap_or_else(|| self.failure_rate())
    }

    fn total_executions(&self) -> u64 {
        self.total_executions.load(Ordering::Relaxed)
    }

    fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }
}
