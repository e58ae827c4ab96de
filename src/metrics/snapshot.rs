//! Immutable aggregated views of collected metrics.

use serde::Serialize;

use crate::pattern::adaptive::Phase;

/// Percentile keys reported when none are configured explicitly.
pub const DEFAULT_PERCENTILES: &[f64] = &[0.5, 0.9, 0.95, 0.99];

/// Distribution summary for one latency series, values in nanoseconds.
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    /// Number of samples in the series.
    pub count: u64,
    /// `(quantile, value_ns)` pairs for the configured percentile keys,
    /// in ascending quantile order.
    pub percentiles: Vec<(f64, u64)>,
    /// Arithmetic mean in nanoseconds.
    pub mean_ns: f64,
    /// Standard deviation in nanoseconds.
    pub stddev_ns: f64,
    /// Smallest sample in nanoseconds.
    pub min_ns: u64,
    /// Largest sample in nanoseconds.
    pub max_ns: u64,
}

impl LatencySummary {
    /// A summary with no samples; percentile values are the 0 sentinel that
    /// exporters render as "N/A".
    pub fn empty(percentiles: &[f64]) -> Self {
        Self {
            count: 0,
            percentiles: percentiles.iter().map(|&q| (q, 0)).collect(),
            mean_ns: 0.0,
            stddev_ns: 0.0,
            min_ns: 0,
            max_ns: 0,
        }
    }

    /// True if the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Value at `quantile` in nanoseconds, if that key was configured.
    pub fn percentile_ns(&self, quantile: f64) -> Option<u64> {
        self.percentiles
            .iter()
            .find(|(q, _)| (q - quantile).abs() < 1e-9)
            .map(|&(_, v)| v)
    }

    /// Value at `quantile` in milliseconds, if that key was configured.
    pub fn percentile_ms(&self, quantile: f64) -> Option<f64> {
        self.percentile_ns(quantile).map(|ns| ns as f64 / 1e6)
    }

    /// Mean in milliseconds.
    pub fn mean_ms(&self) -> f64 {
        self.mean_ns / 1e6
    }

    /// Coefficient of variation (stddev / mean), 0 when the series is empty.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean_ns == 0.0 {
            0.0
        } else {
            self.stddev_ns / self.mean_ns
        }
    }
}

/// Adaptive-pattern state attached to a snapshot when the run was driven by
/// the adaptive pattern.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveStatus {
    /// Current controller phase.
    pub phase: Phase,
    /// Current target TPS.
    pub current_tps: f64,
    /// Latched stable TPS, if stability was detected.
    pub stable_tps: Option<f64>,
    /// Number of phase transitions so far.
    pub phase_transitions: u64,
}

/// A point-in-time, immutable view of all collected metrics.
///
/// Counts and rates are mutually consistent to within one in-flight sample;
/// strict global consistency is not guaranteed and not needed.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Recorded submissions.
    pub total_executions: u64,
    /// Recorded successful completions.
    pub success_count: u64,
    /// Recorded failed completions (including synthetic failures).
    pub failure_count: u64,
    /// Submissions dropped by backpressure.
    pub dropped_count: u64,
    /// Submissions rejected by backpressure.
    pub rejected_count: u64,
    /// Pending-work gauge at snapshot time.
    pub queue_size: u64,
    /// Milliseconds since the collector started.
    pub elapsed_ms: u64,
    /// Successful completions per second over the whole run.
    pub success_tps: f64,
    /// Failed completions per second over the whole run.
    pub failure_tps: f64,
    /// All completions per second over the whole run.
    pub response_tps: f64,
    /// Latency distribution of successful executions.
    pub success_latency: LatencySummary,
    /// Latency distribution of failed executions.
    pub failure_latency: LatencySummary,
    /// Queue-wait distribution (submission to worker start).
    pub queue_wait: LatencySummary,
    /// Adaptive controller state, when an adaptive pattern drove the run.
    pub adaptive: Option<AdaptiveStatus>,
}

impl MetricsSnapshot {
    /// Submissions currently in flight (submitted but not yet completed).
    pub fn in_flight(&self) -> u64 {
        self.total_executions
            .saturating_sub(self.success_count)
            .saturating_sub(self.failure_count)
    }

    /// Completed executions (success + failure).
    pub fn completed(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Failure rate as a percentage of completed executions.
    pub fn failure_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            0.0
        } else {
            self.failure_count as f64 / completed as f64 * 100.0
        }
    }

    /// Success rate as a percentage of completed executions.
    pub fn success_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            0.0
        } else {
            self.success_count as f64 / completed as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with(count: u64, mean: f64, stddev: f64) -> LatencySummary {
        LatencySummary {
            count,
            percentiles: vec![(0.5, 1_000_000), (0.99, 5_000_000)],
            mean_ns: mean,
            stddev_ns: stddev,
            min_ns: 100,
            max_ns: 9_000_000,
        }
    }

    #[test]
    fn test_percentile_lookup() {
        let summary = summary_with(10, 2e6, 1e6);
        assert_eq!(summary.percentile_ns(0.5), Some(1_000_000));
        assert_eq!(summary.percentile_ms(0.99), Some(5.0));
        assert_eq!(summary.percentile_ns(0.75), None);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let summary = summary_with(10, 2e6, 1e6);
        assert!((summary.coefficient_of_variation() - 0.5).abs() < f64::EPSILON);
        assert_eq!(LatencySummary::empty(&[0.5]).coefficient_of_variation(), 0.0);
    }

    #[test]
    fn test_empty_summary_sentinels() {
        let summary = LatencySummary::empty(DEFAULT_PERCENTILES);
        assert!(summary.is_empty());
        assert_eq!(summary.percentile_ns(0.95), Some(0));
    }
}
