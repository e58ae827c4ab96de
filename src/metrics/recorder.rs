//! HdrHistogram-backed latency series.

use hdrhistogram::Histogram;
use parking_lot::RwLock;

use super::snapshot::LatencySummary;

/// Largest trackable sample: one hour in nanoseconds. Larger samples are
/// clamped rather than dropped.
const MAX_TRACKABLE_NS: u64 = 3_600_000_000_000;

/// A latency series recording nanosecond samples into an HdrHistogram.
///
/// Writers take the lock only for the duration of a single `record` call;
/// the summary path locks once and reads every configured quantile from the
/// same coherent histogram state.
pub(crate) struct LatencyRecorder {
    histogram: RwLock<Histogram<u64>>,
}

impl LatencyRecorder {
    pub(crate) fn new() -> Self {
        let histogram = Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_NS, 3)
            .expect("histogram bounds are statically valid");
        Self {
            histogram: RwLock::new(histogram),
        }
    }

    /// Records one sample. Zero samples are clamped up to the smallest
    /// trackable value so sub-resolution timings still count.
    pub(crate) fn record_ns(&self, value_ns: u64) {
        self.histogram.write().saturating_record(value_ns.max(1));
    }

    /// Number of recorded samples.
    pub(crate) fn count(&self) -> u64 {
        self.histogram.read().len()
    }

    /// Summarises the series at the given percentile keys.
    pub(crate) fn summary(&self, percentiles: &[f64]) -> LatencySummary {
        let histogram = self.histogram.read();
        if histogram.len() == 0 {
            return LatencySummary::empty(percentiles);
        }
        LatencySummary {
            count: histogram.len(),
            percentiles: percentiles
                .iter()
                .map(|&q| (q, histogram.value_at_quantile(q)))
                .collect(),
            mean_ns: histogram.mean(),
            stddev_ns: histogram.stdev(),
            min_ns: histogram.min(),
            max_ns: histogram.max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let recorder = LatencyRecorder::new();
        let summary = recorder.summary(&[0.5, 0.99]);
        assert!(summary.is_empty());
        assert_eq!(summary.percentile_ns(0.5), Some(0));
    }

    #[test]
    fn test_known_distribution_percentiles() {
        let recorder = LatencyRecorder::new();
        for ms in 1..=100u64 {
            recorder.record_ns(ms * 1_000_000);
        }
        let summary = recorder.summary(&[0.5, 0.95, 0.99]);
        assert_eq!(summary.count, 100);

        let p50_ms = summary.percentile_ms(0.5).unwrap();
        let p95_ms = summary.percentile_ms(0.95).unwrap();
        assert!((p50_ms - 50.0).abs() < 1.0, "p50 was {}", p50_ms);
        assert!((p95_ms - 95.0).abs() < 1.0, "p95 was {}", p95_ms);
        assert!(summary.min_ns >= 900_000);
        assert!(summary.max_ns >= 99_000_000);
    }

    #[test]
    fn test_zero_sample_clamps_instead_of_dropping() {
        let recorder = LatencyRecorder::new();
        recorder.record_ns(0);
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_oversized_sample_saturates() {
        let recorder = LatencyRecorder::new();
        recorder.record_ns(u64::MAX);
        assert_eq!(recorder.count(), 1);
    }
}
