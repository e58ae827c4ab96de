//! Sinusoidal load oscillation.

use std::f64::consts::TAU;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pattern::{duration_ms, LoadPattern};

/// Oscillates the target rate sinusoidally around a mean.
///
/// `tps(t) = mean + amplitude * sin(2π * t / period)`. The constructor
/// requires `amplitude <= mean` so the output never goes negative.
#[derive(Debug, Clone)]
pub struct SineWaveLoad {
    mean_tps: f64,
    amplitude: f64,
    total_duration: Duration,
    period: Duration,
}

impl SineWaveLoad {
    /// Creates a sine-wave load.
    pub fn new(
        mean_tps: f64,
        amplitude: f64,
        total_duration: Duration,
        period: Duration,
    ) -> Result<Self> {
        if mean_tps <= 0.0 || !mean_tps.is_finite() {
            return Err(Error::pattern(
                "SineWaveLoad",
                format!("meanTps must be positive, got {}", mean_tps),
            ));
        }
        if amplitude < 0.0 || !amplitude.is_finite() {
            return Err(Error::pattern(
                "SineWaveLoad",
                format!("amplitude must be non-negative, got {}", amplitude),
            ));
        }
        if amplitude > mean_tps {
            return Err(Error::pattern(
                "SineWaveLoad",
                format!(
                    "amplitude {} must not exceed meanTps {} or the rate would go negative",
                    amplitude, mean_tps
                ),
            ));
        }
        if total_duration.is_zero() || period.is_zero() {
            return Err(Error::pattern(
                "SineWaveLoad",
                "totalDuration and period must be non-zero",
            ));
        }
        Ok(Self {
            mean_tps,
            amplitude,
            total_duration,
            period,
        })
    }
}

impl LoadPattern for SineWaveLoad {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        if elapsed_ms >= duration_ms(self.total_duration) {
            return 0.0;
        }
        let phase = TAU * (elapsed_ms as f64 / self.period.as_millis() as f64);
        // Clamp guards against float rounding right at the trough when
        // amplitude == mean.
        (self.mean_tps + self.amplitude * phase.sin()).max(0.0)
    }

    fn duration(&self) -> Duration {
        self.total_duration
    }

    fn name(&self) -> &str {
        "sine-wave"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_wave_shape() {
        let pattern = SineWaveLoad::new(
            100.0,
            50.0,
            Duration::from_secs(120),
            Duration::from_secs(60),
        )
        .unwrap();

        // t=0: mean. Quarter period: crest. Half period: mean. Three
        // quarters: trough.
        assert!((pattern.tps(0) - 100.0).abs() < 0.01);
        assert!((pattern.tps(15_000) - 150.0).abs() < 0.01);
        assert!((pattern.tps(30_000) - 100.0).abs() < 0.01);
        assert!((pattern.tps(45_000) - 50.0).abs() < 0.01);
        assert_eq!(pattern.tps(120_000), 0.0);
    }

    #[test]
    fn test_output_never_negative_at_full_amplitude() {
        let pattern = SineWaveLoad::new(
            100.0,
            100.0,
            Duration::from_secs(60),
            Duration::from_secs(10),
        )
        .unwrap();
        for t in (0..60_000).step_by(137) {
            assert!(pattern.tps(t) >= 0.0, "negative tps at t={}", t);
        }
    }

    #[test]
    fn test_rejects_amplitude_above_mean() {
        assert!(SineWaveLoad::new(
            100.0,
            150.0,
            Duration::from_secs(60),
            Duration::from_secs(10),
        )
        .is_err());
    }
}
