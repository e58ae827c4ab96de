//! Metrics collection and aggregation.
//!
//! The collector sits on the hot path of every worker: recording must be
//! cheap and must never block dispatch. Counters are plain atomics; latency
//! distributions go into HdrHistograms behind short-lived locks; the
//! snapshot is an immutable point-in-time view cheap enough to take every
//! export tick.
//!
//! Two read surfaces are exposed:
//!
//! - [`MetricsSnapshot`] — the full aggregated view, consumed by exporters.
//! - [`MetricsProvider`] — the narrow view the adaptive pattern polls once
//!   per ramp interval (failure rates and counts only).

mod collector;
mod recorder;
mod snapshot;
mod window;

pub use collector::MetricsCollector;
pub use snapshot::{AdaptiveStatus, LatencySummary, MetricsSnapshot, DEFAULT_PERCENTILES};

use std::time::Instant;

use crate::task::TaskResult;

/// Per-execution record produced by the engine and consumed once by the
/// collector. Immutable.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    /// When the dispatch loop handed the work to a worker.
    pub submitted_at: Instant,
    /// When the worker actually began executing.
    pub started_at: Instant,
    /// When the task body returned.
    pub completed_at: Instant,
    /// What the task body returned.
    pub outcome: TaskResult,
    /// The submission index.
    pub iteration: u64,
}

impl ExecutionRecord {
    /// Execution latency in nanoseconds (start to completion).
    pub fn latency_ns(&self) -> u64 {
        self.completed_at
            .duration_since(self.started_at)
            .as_nanos() as u64
    }

    /// Queue wait in nanoseconds (submission to start).
    pub fn queue_wait_ns(&self) -> u64 {
        self.started_at
            .duration_since(self.submitted_at)
            .as_nanos() as u64
    }
}

/// The narrow metrics view consumed by load patterns.
///
/// Rates are expressed as **percentages** in `0..=100`, not ratios — the
/// adaptive decision path normalises to ratios once at its boundary.
pub trait MetricsProvider: Send + Sync {
    /// All-time failure rate as a percentage of completed executions.
    fn failure_rate(&self) -> f64;

    /// Failure rate over the trailing `window_secs` seconds, as a
    /// percentage. Falls back to the all-time rate when the window holds no
    /// samples.
    fn recent_failure_rate(&self, window_secs: u64) -> f64;

    /// Total recorded submissions.
    fn total_executions(&self) -> u64;

    /// Total recorded failures.
    fn failure_count(&self) -> u64;
}
