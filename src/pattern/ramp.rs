//! Linear ramp patterns.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::pattern::{duration_ms, LoadPattern, INDEFINITE};

/// Linear ramp from zero to `max_tps` over `ramp_duration`, saturating at
/// `max_tps` afterwards until the engine is stopped externally.
#[derive(Debug, Clone)]
pub struct RampUpLoad {
    max_tps: f64,
    ramp_duration: Duration,
}

impl RampUpLoad {
    /// Creates a ramp to `max_tps` over `ramp_duration`.
    pub fn new(max_tps: f64, ramp_duration: Duration) -> Result<Self> {
        if max_tps <= 0.0 || !max_tps.is_finite() {
            return Err(Error::pattern(
                "RampUpLoad",
                format!("maxTps must be positive, got {}", max_tps),
            ));
        }
        if ramp_duration.is_zero() {
            return Err(Error::pattern("RampUpLoad", "rampDuration must be non-zero"));
        }
        Ok(Self {
            max_tps,
            ramp_duration,
        })
    }
}

impl LoadPattern for RampUpLoad {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        let ramp_ms = duration_ms(self.ramp_duration);
        if elapsed_ms >= ramp_ms {
            self.max_tps
        } else {
            self.max_tps * (elapsed_ms as f64 / ramp_ms as f64)
        }
    }

    fn duration(&self) -> Duration {
        INDEFINITE
    }

    fn name(&self) -> &str {
        "ramp-up"
    }
}

/// Linear ramp to `max_tps` followed by a bounded sustain; total duration is
/// ramp + sustain.
#[derive(Debug, Clone)]
pub struct RampUpToMaxLoad {
    ramp: RampUpLoad,
    sustain_duration: Duration,
}

impl RampUpToMaxLoad {
    /// Creates a ramp-then-sustain pattern.
    pub fn new(max_tps: f64, ramp_duration: Duration, sustain_duration: Duration) -> Result<Self> {
        if sustain_duration.is_zero() {
            return Err(Error::pattern(
                "RampUpToMaxLoad",
                "sustainDuration must be non-zero",
            ));
        }
        Ok(Self {
            ramp: RampUpLoad::new(max_tps, ramp_duration)?,
            sustain_duration,
        })
    }
}

impl LoadPattern for RampUpToMaxLoad {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        if elapsed_ms >= duration_ms(self.duration()) {
            0.0
        } else {
            self.ramp.tps(elapsed_ms)
        }
    }

    fn duration(&self) -> Duration {
        self.ramp.ramp_duration + self.sustain_duration
    }

    fn name(&self) -> &str {
        "ramp-up-to-max"
    }
}
