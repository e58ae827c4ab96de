//! Warm-up/cool-down wrapper around a base pattern.
//!
//! Warm-up and cool-down samples distort measured results: connection pools
//! are cold, JIT-style caches are empty, in-flight work is draining. This
//! wrapper ramps traffic in and out linearly around any base pattern and
//! tells the engine, via [`LoadPattern::should_record_metrics`], to exclude
//! those segments from the measured results.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pattern::{duration_ms, LoadPattern};

/// Segment of a wrapped run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Ramping in; metrics are not recorded.
    WarmUp,
    /// The base pattern is driving; metrics are recorded.
    Steady,
    /// Ramping out; metrics are not recorded.
    CoolDown,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::WarmUp => write!(f, "warm-up"),
            LoadPhase::Steady => write!(f, "steady"),
            LoadPhase::CoolDown => write!(f, "cool-down"),
        }
    }
}

/// Wraps a base pattern with linear warm-up and cool-down segments.
///
/// Total duration is `warmup + base.duration() + cooldown`. Zero-length
/// warm-up or cool-down segments are permitted (jump-in / jump-out).
pub struct WarmupCooldownPattern {
    base: Box<dyn LoadPattern>,
    warmup: Duration,
    cooldown: Duration,
    base_duration_ms: u64,
}

impl WarmupCooldownPattern {
    /// Wraps `base` with the given warm-up and cool-down durations.
    ///
    /// The base pattern must have a bounded duration: the cool-down segment
    /// ramps down from the base's final rate, which an indefinite pattern
    /// does not have.
    pub fn new(
        base: impl LoadPattern + 'static,
        warmup: Duration,
        cooldown: Duration,
    ) -> Result<Self> {
        if base.is_indefinite() {
            return Err(Error::pattern(
                "WarmupCooldownPattern",
                "base pattern must have a bounded duration",
            ));
        }
        let base_duration_ms = duration_ms(base.duration());
        Ok(Self {
            base: Box::new(base),
            warmup,
            cooldown,
            base_duration_ms,
        })
    }

    fn warmup_ms(&self) -> u64 {
        self.warmup.as_millis() as u64
    }

    fn cooldown_ms(&self) -> u64 {
        self.cooldown.as_millis() as u64
    }

    fn steady_end_ms(&self) -> u64 {
        self.warmup_ms() + self.base_duration_ms
    }

    /// The base pattern's rate at the start of the steady segment.
    fn entry_rate(&self) -> f64 {
        self.base.tps(0)
    }

    /// The base pattern's final in-range rate, used as the cool-down anchor.
    /// Patterns report 0 at and after their end, so sample just inside it.
    fn exit_rate(&self) -> f64 {
        self.base.tps(self.base_duration_ms.saturating_sub(1))
    }

    /// The segment at `elapsed_ms`.
    pub fn phase(&self, elapsed_ms: u64) -> LoadPhase {
        if elapsed_ms < self.warmup_ms() {
            LoadPhase::WarmUp
        } else if elapsed_ms < self.steady_end_ms() {
            LoadPhase::Steady
        } else {
            LoadPhase::CoolDown
        }
    }
}

impl LoadPattern for WarmupCooldownPattern {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        match self.phase(elapsed_ms) {
            LoadPhase::WarmUp => {
                let warmup_ms = self.warmup_ms();
                if warmup_ms == 0 {
                    self.entry_rate()
                } else {
                    self.entry_rate() * (elapsed_ms as f64 / warmup_ms as f64)
                }
            }
            LoadPhase::Steady => self.base.tps(elapsed_ms - self.warmup_ms()),
            LoadPhase::CoolDown => {
                let cooldown_ms = self.cooldown_ms();
                let into_cooldown = elapsed_ms.saturating_sub(self.steady_end_ms());
                if cooldown_ms == 0 || into_cooldown >= cooldown_ms {
                    0.0
                } else {
                    let remaining = 1.0 - (into_cooldown as f64 / cooldown_ms as f64);
                    self.exit_rate() * remaining
                }
            }
        }
    }

    fn duration(&self) -> Duration {
        self.warmup + self.base.duration() + self.cooldown
    }

    fn should_record_metrics(&self, elapsed_ms: u64) -> bool {
        self.phase(elapsed_ms) == LoadPhase::Steady
    }

    fn current_phase(&self, elapsed_ms: u64) -> Option<LoadPhase> {
        Some(self.phase(elapsed_ms))
    }

    fn name(&self) -> &str {
        "warmup-cooldown"
    }
}
