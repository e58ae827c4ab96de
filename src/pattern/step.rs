//! Piecewise-constant step load.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::pattern::LoadPattern;

/// One step of a [`StepLoad`]: a rate held for a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Target rate during this step.
    pub rate: f64,
    /// How long the step lasts.
    pub duration: Duration,
}

impl Step {
    /// Creates a step.
    pub fn new(rate: f64, duration: Duration) -> Self {
        Self { rate, duration }
    }
}

/// An ordered sequence of `(rate, duration)` steps. TPS past the last step
/// is zero; total duration is the sum of the step durations.
#[derive(Debug, Clone)]
pub struct StepLoad {
    steps: Vec<Step>,
    // Cumulative end offsets in ms, one per step, so lookup is a scan over a
    // prefix-sum rather than re-summing on every tps() call.
    boundaries_ms: Vec<u64>,
}

impl StepLoad {
    /// Creates a step load from an ordered list of steps.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::pattern("StepLoad", "steps must not be empty"));
        }
        for (i, step) in steps.iter().enumerate() {
            if step.rate <= 0.0 || !step.rate.is_finite() {
                return Err(Error::pattern(
                    "StepLoad",
                    format!("step {} rate must be positive, got {}", i, step.rate),
                ));
            }
            if step.duration.is_zero() {
                return Err(Error::pattern(
                    "StepLoad",
                    format!("step {} duration must be non-zero", i),
                ));
            }
        }

        let mut boundaries_ms = Vec::with_capacity(steps.len());
        let mut acc: u64 = 0;
        for step in &steps {
            acc = acc.saturating_add(step.duration.as_millis() as u64);
            boundaries_ms.push(acc);
        }

        Ok(Self {
            steps,
            boundaries_ms,
        })
    }

    /// The configured steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl LoadPattern for StepLoad {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        for (step, boundary) in self.steps.iter().zip(&self.boundaries_ms) {
            if elapsed_ms < *boundary {
                return step.rate;
            }
        }
        0.0
    }

    fn duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    fn name(&self) -> &str {
        "step"
    }
}
