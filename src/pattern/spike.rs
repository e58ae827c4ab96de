//! Periodic traffic spikes over a base rate.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::pattern::{duration_ms, LoadPattern};

/// Alternates between a spike rate and a base rate on a fixed cycle.
///
/// Within each `interval` window starting at `t = 0`, the first
/// `spike_duration` runs at `spike_tps` and the remainder at `base_tps`.
#[derive(Debug, Clone)]
pub struct SpikeLoad {
    base_tps: f64,
    spike_tps: f64,
    total_duration: Duration,
    interval: Duration,
    spike_duration: Duration,
}

impl SpikeLoad {
    /// Creates a spike load.
    pub fn new(
        base_tps: f64,
        spike_tps: f64,
        total_duration: Duration,
        interval: Duration,
        spike_duration: Duration,
    ) -> Result<Self> {
        if base_tps < 0.0 || !base_tps.is_finite() {
            return Err(Error::pattern(
                "SpikeLoad",
                format!("baseTps must be non-negative, got {}", base_tps),
            ));
        }
        if spike_tps < 0.0 || !spike_tps.is_finite() {
            return Err(Error::pattern(
                "SpikeLoad",
                format!("spikeTps must be non-negative, got {}", spike_tps),
            ));
        }
        if total_duration.is_zero() || interval.is_zero() {
            return Err(Error::pattern(
                "SpikeLoad",
                "totalDuration and interval must be non-zero",
            ));
        }
        if spike_duration >= interval {
            return Err(Error::pattern(
                "SpikeLoad",
                format!(
                    "spikeDuration {:?} must be shorter than interval {:?}",
                    spike_duration, interval
                ),
            ));
        }
        Ok(Self {
            base_tps,
            spike_tps,
            total_duration,
            interval,
            spike_duration,
        })
    }
}

impl LoadPattern for SpikeLoad {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        if elapsed_ms >= duration_ms(self.total_duration) {
            return 0.0;
        }
        let position_ms = elapsed_ms % duration_ms(self.interval).max(1);
        if position_ms < self.spike_duration.as_millis() as u64 {
            self.spike_tps
        } else {
            self.base_tps
        }
    }

    fn duration(&self) -> Duration {
        self.total_duration
    }

    fn name(&self) -> &str {
        "spike"
    }
}
