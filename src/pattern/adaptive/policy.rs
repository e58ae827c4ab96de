//! Ramp decision policy: the pluggable judgment calls of the controller.

use super::config::AdaptiveConfig;

/// One interval's normalised health reading.
///
/// Rates here are **ratios** in `[0, 1]`. The metrics provider reports
/// percentages; the pattern divides by 100 exactly once when it builds the
/// observation, so policy implementations never worry about units.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    /// All-time failure ratio.
    pub failure_rate: f64,
    /// Failure ratio over the configured recent window.
    pub recent_failure_rate: f64,
    /// Backpressure level in `[0, 1]`; 0 when no provider is wired.
    pub backpressure: f64,
    /// Total recorded submissions so far.
    pub total_executions: u64,
}

impl Observation {
    /// True when conditions are good: the recent failure ratio is below the
    /// error threshold and backpressure is below the ramp-up threshold.
    pub fn is_good(&self, config: &AdaptiveConfig) -> bool {
        self.recent_failure_rate < config.error_threshold
            && self.backpressure < config.backpressure_ramp_up_threshold
    }
}

/// The pluggable judgment calls that drive phase transitions.
pub trait RampDecisionPolicy: Send + Sync {
    /// Whether the controller may push the rate up this interval.
    fn should_ramp_up(&self, observation: &Observation, config: &AdaptiveConfig) -> bool;

    /// Whether the controller must back off this interval.
    fn should_ramp_down(&self, observation: &Observation, config: &AdaptiveConfig) -> bool;

    /// Whether a controller parked at the floor may climb again.
    fn can_recover_from_minimum(&self, observation: &Observation, config: &AdaptiveConfig)
        -> bool;

    /// Whether the stability streak is long enough to latch.
    fn should_sustain(&self, consecutive_stable_intervals: u32, required: u32) -> bool;
}

/// Default policy.
///
/// Ramping up looks at the *recent* failure rate so a burst of old failures
/// cannot pin the controller down forever; ramping down looks at the
/// all-time rate so sustained degradation is never ignored. Recovery is
/// deliberately lenient: after a full back-off the all-time failure rate
/// stays polluted for a long time, so escape relies mostly on backpressure
/// having subsided.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRampPolicy;

impl RampDecisionPolicy for DefaultRampPolicy {
    fn should_ramp_up(&self, observation: &Observation, config: &AdaptiveConfig) -> bool {
        observation.recent_failure_rate < config.error_threshold
            && observation.backpressure < config.backpressure_ramp_up_threshold
    }

    fn should_ramp_down(&self, observation: &Observation, config: &AdaptiveConfig) -> bool {
        observation.failure_rate >= config.error_threshold
            || observation.backpressure >= config.backpressure_ramp_down_threshold
    }

    fn can_recover_from_minimum(
        &self,
        observation: &Observation,
        config: &AdaptiveConfig,
    ) -> bool {
        observation.backpressure < 0.3
            || (observation.recent_failure_rate < config.error_threshold
                && observation.backpressure < 0.5)
    }

    fn should_sustain(&self, consecutive_stable_intervals: u32, required: u32) -> bool {
        consecutive_stable_intervals >= required
    }
}
