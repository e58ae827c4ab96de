//! Load patterns: target-throughput curves over time.
//!
//! A load pattern is a function from elapsed time to a target TPS. The
//! execution engine polls it once per dispatch decision; the rate controller
//! turns the returned rate into an inter-arrival delay.
//!
//! Built-in patterns:
//!
//! - [`StaticLoad`] — constant rate for a fixed duration
//! - [`RampUpLoad`] — linear 0→max, then saturated until stopped
//! - [`RampUpToMaxLoad`] — linear ramp followed by a bounded sustain
//! - [`StepLoad`] — piecewise-constant steps
//! - [`SpikeLoad`] — periodic spikes over a base rate
//! - [`SineWaveLoad`] — sinusoidal oscillation around a mean
//! - [`WarmupCooldownPattern`] — wraps any pattern with warm-up/cool-down
//!   phases that are excluded from measured results
//! - [`AdaptiveLoadPattern`](adaptive::AdaptiveLoadPattern) — metrics-driven
//!   feedback controller (see the [`adaptive`] submodule)

pub mod adaptive;
mod ramp;
mod sine;
mod spike;
mod static_load;
mod step;
mod warmup;

pub use ramp::{RampUpLoad, RampUpToMaxLoad};
pub use sine::SineWaveLoad;
pub use spike::SpikeLoad;
pub use static_load::StaticLoad;
pub use step::{Step, StepLoad};
pub use warmup::{LoadPhase, WarmupCooldownPattern};

use std::time::Duration;

/// Sentinel duration meaning "run until externally stopped".
pub const INDEFINITE: Duration = Duration::MAX;

/// A target throughput curve over time.
///
/// Two calls with the same elapsed time and the same internal state must
/// return the same value; non-adaptive patterns are pure functions of
/// elapsed time and configuration.
pub trait LoadPattern: Send + Sync {
    /// Target transactions per second at `elapsed_ms` milliseconds into the
    /// run. Always `>= 0`.
    fn tps(&self, elapsed_ms: u64) -> f64;

    /// Intended test length. [`INDEFINITE`] means the engine runs until an
    /// external stop is requested.
    fn duration(&self) -> Duration;

    /// Whether executions at this point of the run should be recorded into
    /// the measured results. Wrappers that segment the run (warm-up /
    /// cool-down) override this; everything else records throughout.
    fn should_record_metrics(&self, elapsed_ms: u64) -> bool {
        let _ = elapsed_ms;
        true
    }

    /// The run segment at `elapsed_ms`, for patterns that segment the run.
    fn current_phase(&self, elapsed_ms: u64) -> Option<LoadPhase> {
        let _ = elapsed_ms;
        None
    }

    /// Short name used in reports and logs.
    fn name(&self) -> &str;

    /// True if this pattern runs until externally stopped.
    fn is_indefinite(&self) -> bool {
        self.duration() == INDEFINITE
    }

    /// Controller status, for patterns driven by runtime feedback. Exporters
    /// attach it to the final snapshot when present.
    fn adaptive_status(&self) -> Option<crate::metrics::AdaptiveStatus> {
        None
    }
}

/// Converts a pattern duration to a millisecond bound, saturating for
/// indefinite patterns.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    if d == INDEFINITE {
        u64::MAX
    } else {
        d.as_millis().min(u64::MAX as u128) as u64
    }
}
