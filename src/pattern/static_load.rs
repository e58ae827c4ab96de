//! Constant-rate load.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::pattern::{duration_ms, LoadPattern};

/// A constant target rate held for a fixed duration.
#[derive(Debug, Clone)]
pub struct StaticLoad {
    rate: f64,
    duration: Duration,
}

impl StaticLoad {
    /// Creates a static load of `rate` TPS for `duration`.
    pub fn new(rate: f64, duration: Duration) -> Result<Self> {
        if rate <= 0.0 || !rate.is_finite() {
            return Err(Error::pattern(
                "StaticLoad",
                format!("rate must be positive, got {}", rate),
            ));
        }
        if duration.is_zero() {
            return Err(Error::pattern("StaticLoad", "duration must be non-zero"));
        }
        Ok(Self { rate, duration })
    }

    /// The configured rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl LoadPattern for StaticLoad {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        if elapsed_ms < duration_ms(self.duration) {
            self.rate
        } else {
            0.0
        }
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn name(&self) -> &str {
        "static"
    }
}
