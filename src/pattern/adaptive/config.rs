//! Adaptive controller configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Immutable configuration for the adaptive pattern. Built via
/// [`AdaptiveConfig::builder`]; every constraint is checked in
/// [`AdaptiveConfigBuilder::build`], so a constructed config is always
/// internally consistent.
#[derive(Debug, Clone)]
pub struct AdaptiveConfig {
    /// Starting target rate.
    pub initial_tps: f64,
    /// Added per interval while ramping up.
    pub ramp_increment: f64,
    /// Subtracted per interval while ramping down.
    pub ramp_decrement: f64,
    /// How often metrics are consulted and the target adjusted.
    pub ramp_interval: Duration,
    /// Upper bound on the target rate; may be `f64::INFINITY`.
    pub max_tps: f64,
    /// Lower bound on the target rate.
    pub min_tps: f64,
    /// How long to hold a sustained level before probing upward again.
    pub sustain_duration: Duration,
    /// Failure-rate ratio in `[0, 1]` above which conditions are bad.
    pub error_threshold: f64,
    /// Backpressure level below which ramping up is permitted.
    pub backpressure_ramp_up_threshold: f64,
    /// Backpressure level at or above which ramping down is forced.
    /// Strictly greater than the ramp-up threshold.
    pub backpressure_ramp_down_threshold: f64,
    /// Consecutive good intervals required to latch stability.
    pub stable_intervals_required: u32,
    /// How far the rate may drift from a stability candidate, in TPS.
    pub tps_tolerance: f64,
    /// Fraction of the last known good rate to resume at after recovery,
    /// in `(0, 1]`.
    pub recovery_tps_ratio: f64,
    /// Optional linear warm-in from zero to `initial_tps`; decisions are
    /// deferred until it has elapsed.
    pub initial_ramp_duration: Option<Duration>,
    /// Window for the recent failure rate consulted each interval.
    pub recent_window_secs: u64,
}

impl AdaptiveConfig {
    /// Starts building a config from the defaults.
    pub fn builder() -> AdaptiveConfigBuilder {
        AdaptiveConfigBuilder::default()
    }

    /// Ramp interval in milliseconds.
    pub(crate) fn ramp_interval_ms(&self) -> u64 {
        self.ramp_interval.as_millis() as u64
    }

    /// Sustain duration in milliseconds.
    pub(crate) fn sustain_duration_ms(&self) -> u64 {
        self.sustain_duration.as_millis() as u64
    }

    fn validate(&self) -> Result<()> {
        if self.initial_tps <= 0.0 || !self.initial_tps.is_finite() {
            return Err(Error::config(format!(
                "initialTps must be positive and finite, got {}",
                self.initial_tps
            )));
        }
        if self.ramp_increment <= 0.0 || self.ramp_decrement <= 0.0 {
            return Err(Error::config(
                "rampIncrement and rampDecrement must be positive",
            ));
        }
        if self.ramp_interval.is_zero() {
            return Err(Error::config("rampInterval must be non-zero"));
        }
        if self.min_tps <= 0.0 || !self.min_tps.is_finite() {
            return Err(Error::config(format!(
                "minTps must be positive and finite, got {}",
                self.min_tps
            )));
        }
        if self.min_tps >= self.max_tps {
            return Err(Error::config(format!(
                "minTps {} must be below maxTps {}",
                self.min_tps, self.max_tps
            )));
        }
        if self.initial_tps < self.min_tps || self.initial_tps > self.max_tps {
            return Err(Error::config(format!(
                "initialTps {} must lie within [minTps {}, maxTps {}]",
                self.initial_tps, self.min_tps, self.max_tps
            )));
        }
        if !(0.0..=1.0).contains(&self.error_threshold) {
            return Err(Error::config(format!(
                "errorThreshold must be in [0, 1], got {}",
                self.error_threshold
            )));
        }
        let up = self.backpressure_ramp_up_threshold;
        let down = self.backpressure_ramp_down_threshold;
        if !(0.0..=1.0).contains(&up) || !(0.0..=1.0).contains(&down) || up >= down {
            return Err(Error::config(format!(
                "backpressure thresholds must satisfy 0 <= up < down <= 1, got up={}, down={}",
                up, down
            )));
        }
        if self.stable_intervals_required < 1 {
            return Err(Error::config("stableIntervalsRequired must be at least 1"));
        }
        if self.tps_tolerance <= 0.0 {
            return Err(Error::config(format!(
                "tpsTolerance must be positive, got {}",
                self.tps_tolerance
            )));
        }
        if !(self.recovery_tps_ratio > 0.0 && self.recovery_tps_ratio <= 1.0) {
            return Err(Error::config(format!(
                "recoveryTpsRatio must be in (0, 1], got {}",
                self.recovery_tps_ratio
            )));
        }
        if self.recent_window_secs == 0 {
            return Err(Error::config("recentWindowSecs must be non-zero"));
        }
        Ok(())
    }
}

/// Builder for [`AdaptiveConfig`].
#[derive(Debug, Clone)]
pub struct AdaptiveConfigBuilder {
    config: AdaptiveConfig,
}

impl Default for AdaptiveConfigBuilder {
    fn default() -> Self {
        Self {
            config: AdaptiveConfig {
                initial_tps: 100.0,
                ramp_increment: 50.0,
                ramp_decrement: 100.0,
                ramp_interval: Duration::from_secs(1),
                max_tps: f64::INFINITY,
                min_tps: 1.0,
                sustain_duration: Duration::from_secs(10),
                error_threshold: 0.01,
                backpressure_ramp_up_threshold: 0.5,
                backpressure_ramp_down_threshold: 0.8,
                stable_intervals_required: 3,
                tps_tolerance: 5.0,
                recovery_tps_ratio: 0.5,
                initial_ramp_duration: None,
                recent_window_secs: 10,
            },
        }
    }
}

impl AdaptiveConfigBuilder {
    /// Sets the starting target rate.
    pub fn initial_tps(mut self, tps: f64) -> Self {
        self.config.initial_tps = tps;
        self
    }

    /// Sets the per-interval ramp-up step.
    pub fn ramp_increment(mut self, tps: f64) -> Self {
        self.config.ramp_increment = tps;
        self
    }

    /// Sets the per-interval ramp-down step.
    pub fn ramp_decrement(mut self, tps: f64) -> Self {
        self.config.ramp_decrement = tps;
        self
    }

    /// Sets the decision interval.
    pub fn ramp_interval(mut self, interval: Duration) -> Self {
        self.config.ramp_interval = interval;
        self
    }

    /// Sets the rate ceiling.
    pub fn max_tps(mut self, tps: f64) -> Self {
        self.config.max_tps = tps;
        self
    }

    /// Sets the rate floor.
    pub fn min_tps(mut self, tps: f64) -> Self {
        self.config.min_tps = tps;
        self
    }

    /// Sets how long a sustained level is held before probing upward.
    pub fn sustain_duration(mut self, duration: Duration) -> Self {
        self.config.sustain_duration = duration;
        self
    }

    /// Sets the failure-rate ratio above which conditions are bad.
    pub fn error_threshold(mut self, ratio: f64) -> Self {
        self.config.error_threshold = ratio;
        self
    }

    /// Sets the backpressure level below which ramp-up is permitted.
    pub fn backpressure_ramp_up_threshold(mut self, level: f64) -> Self {
        self.config.backpressure_ramp_up_threshold = level;
        self
    }

    /// Sets the backpressure level that forces ramp-down.
    pub fn backpressure_ramp_down_threshold(mut self, level: f64) -> Self {
        self.config.backpressure_ramp_down_threshold = level;
        self
    }

    /// Sets the consecutive good intervals required to latch stability.
    pub fn stable_intervals_required(mut self, intervals: u32) -> Self {
        self.config.stable_intervals_required = intervals;
        self
    }

    /// Sets the stability drift tolerance in TPS.
    pub fn tps_tolerance(mut self, tps: f64) -> Self {
        self.config.tps_tolerance = tps;
        self
    }

    /// Sets the fraction of the last known good rate used after recovery.
    pub fn recovery_tps_ratio(mut self, ratio: f64) -> Self {
        self.config.recovery_tps_ratio = ratio;
        self
    }

    /// Enables a linear warm-in from zero to the initial rate.
    pub fn initial_ramp_duration(mut self, duration: Duration) -> Self {
        self.config.initial_ramp_duration = Some(duration);
        self
    }

    /// Sets the recent failure-rate window consulted each interval.
    pub fn recent_window_secs(mut self, secs: u64) -> Self {
        self.config.recent_window_secs = secs;
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<AdaptiveConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
