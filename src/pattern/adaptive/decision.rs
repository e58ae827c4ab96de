//! The decision engine: a pure function from (state, observation) to the
//! next state.
//!
//! Keeping this free of clocks, locks, and providers makes every transition
//! in the phase table directly testable: feed a state and an observation,
//! assert on the successor state.

use tracing::debug;

use super::config::AdaptiveConfig;
use super::policy::{Observation, RampDecisionPolicy};
use super::state::{AdaptiveState, Phase};

/// Computes the controller state for the next interval.
pub(crate) fn decide(
    previous: &AdaptiveState,
    observation: &Observation,
    config: &AdaptiveConfig,
    policy: &dyn RampDecisionPolicy,
    elapsed_ms: u64,
) -> AdaptiveState {
    let mut next = previous.clone();
    next.core.last_adjustment_ms = elapsed_ms;

    // Any interval that completes under good conditions raises the
    // watermark recovery climbs back toward.
    if observation.is_good(config) {
        next.recovery.last_known_good_tps = next
            .recovery
            .last_known_good_tps
            .max(previous.core.current_tps);
    }

    match previous.core.phase {
        Phase::RampUp => ramp_up_interval(&mut next, observation, config, policy, elapsed_ms),
        Phase::RampDown => ramp_down_interval(&mut next, observation, config, policy, elapsed_ms),
        Phase::Sustain => sustain_interval(&mut next, observation, config, policy, elapsed_ms),
        Phase::Recovery => recovery_interval(&mut next, observation, config, policy, elapsed_ms),
    }

    debug_assert!(
        next.core.current_tps >= config.min_tps && next.core.current_tps <= config.max_tps,
        "target rate {} escaped [{}, {}]",
        next.core.current_tps,
        config.min_tps,
        config.max_tps
    );
    next
}

fn ramp_up_interval(
    next: &mut AdaptiveState,
    observation: &Observation,
    config: &AdaptiveConfig,
    policy: &dyn RampDecisionPolicy,
    elapsed_ms: u64,
) {
    if policy.should_ramp_down(observation, config) {
        back_off(next, config, elapsed_ms);
        return;
    }

    if track_stability(next, observation, config, policy, elapsed_ms) {
        latch_sustain(next, elapsed_ms);
        return;
    }

    if next.core.current_tps >= config.max_tps {
        // Reached the ceiling: nothing left to probe.
        next.set_phase(Phase::Sustain, elapsed_ms);
        return;
    }

    if policy.should_ramp_up(observation, config) {
        next.core.current_tps = (next.core.current_tps + config.ramp_increment).min(config.max_tps);
        debug!(tps = next.core.current_tps, "ramping up");
    }
    // Otherwise: conditions are neither good enough to climb nor bad enough
    // to back off. Hold at the current rate.
}

fn ramp_down_interval(
    next: &mut AdaptiveState,
    observation: &Observation,
    config: &AdaptiveConfig,
    policy: &dyn RampDecisionPolicy,
    elapsed_ms: u64,
) {
    if policy.should_ramp_down(observation, config) {
        next.core.current_tps = (next.core.current_tps - config.ramp_decrement).max(config.min_tps);
        debug!(tps = next.core.current_tps, "ramping down");
        if next.core.current_tps <= config.min_tps {
            // Bottomed out. Park in recovery so improved conditions can
            // always pull the controller back up.
            next.set_phase(Phase::Recovery, elapsed_ms);
            next.recovery.recovery_start_ms = Some(elapsed_ms);
            next.stability.reset_candidate();
        }
        return;
    }

    if track_stability(next, observation, config, policy, elapsed_ms) {
        latch_sustain(next, elapsed_ms);
    }
    // Conditions recovered but stability is not yet proven: hold the current
    // rate in RampDown while the streak builds.
}

fn sustain_interval(
    next: &mut AdaptiveState,
    observation: &Observation,
    config: &AdaptiveConfig,
    policy: &dyn RampDecisionPolicy,
    elapsed_ms: u64,
) {
    if policy.should_ramp_down(observation, config) {
        back_off(next, config, elapsed_ms);
        return;
    }

    let sustained_for = elapsed_ms.saturating_sub(next.core.phase_start_ms);
    if sustained_for >= config.sustain_duration_ms()
        && policy.should_ramp_up(observation, config)
        && next.core.current_tps < config.max_tps
    {
        next.set_phase(Phase::RampUp, elapsed_ms);
        next.stability.reset_candidate();
    }
}

fn recovery_interval(
    next: &mut AdaptiveState,
    observation: &Observation,
    config: &AdaptiveConfig,
    policy: &dyn RampDecisionPolicy,
    elapsed_ms: u64,
) {
    if policy.can_recover_from_minimum(observation, config) {
        let resume_tps = (next.recovery.last_known_good_tps * config.recovery_tps_ratio)
            .max(config.min_tps)
            .min(config.max_tps);
        debug!(
            last_known_good = next.recovery.last_known_good_tps,
            resume_tps, "recovering from minimum"
        );
        next.set_phase(Phase::RampUp, elapsed_ms);
        next.core.current_tps = resume_tps;
        next.recovery.recovery_start_ms = None;
        next.stability.reset_candidate();
    }
    // Otherwise: stay parked at the floor.
}

/// Enters RampDown from RampUp or Sustain, applying the first decrement
/// immediately.
fn back_off(next: &mut AdaptiveState, config: &AdaptiveConfig, elapsed_ms: u64) {
    next.set_phase(Phase::RampDown, elapsed_ms);
    next.core.current_tps = (next.core.current_tps - config.ramp_decrement).max(config.min_tps);
    next.stability.reset_candidate();
    debug!(tps = next.core.current_tps, "backing off");
}

/// Feeds this interval into the stability tracker. Returns true when the
/// streak reaches the configured length.
fn track_stability(
    next: &mut AdaptiveState,
    observation: &Observation,
    config: &AdaptiveConfig,
    policy: &dyn RampDecisionPolicy,
    elapsed_ms: u64,
) -> bool {
    if !observation.is_good(config) {
        next.stability.reset_candidate();
        return false;
    }

    let current = next.core.current_tps;
    match next.stability.candidate_tps {
        Some(candidate) if (current - candidate).abs() <= config.tps_tolerance => {
            next.stability.consecutive_stable_intervals += 1;
        }
        _ => {
            next.stability.candidate_tps = Some(current);
            next.stability.stable_since_ms = Some(elapsed_ms);
            next.stability.consecutive_stable_intervals = 1;
        }
    }

    policy.should_sustain(
        next.stability.consecutive_stable_intervals,
        config.stable_intervals_required,
    )
}

/// Latches the current rate as stable and moves to Sustain.
fn latch_sustain(next: &mut AdaptiveState, elapsed_ms: u64) {
    next.stability.stable_tps = Some(next.core.current_tps);
    next.set_phase(Phase::Sustain, elapsed_ms);
    debug!(stable_tps = next.core.current_tps, "stability detected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::adaptive::policy::DefaultRampPolicy;
    use std::time::Duration;

    fn config() -> AdaptiveConfig {
        AdaptiveConfig::builder()
            .initial_tps(100.0)
            .ramp_increment(50.0)
            .ramp_decrement(100.0)
            .ramp_interval(Duration::from_secs(1))
            .max_tps(1_000.0)
            .min_tps(10.0)
            .sustain_duration(Duration::from_secs(10))
            .error_threshold(0.01)
            .build()
            .unwrap()
    }

    fn clean() -> Observation {
        Observation {
            failure_rate: 0.0,
            recent_failure_rate: 0.0,
            backpressure: 0.0,
            total_executions: 10_000,
        }
    }

    fn failing(rate: f64) -> Observation {
        Observation {
            failure_rate: rate,
            recent_failure_rate: rate,
            backpressure: 0.0,
            total_executions: 10_000,
        }
    }

    fn step(state: &AdaptiveState, obs: &Observation, cfg: &AdaptiveConfig, at: u64) -> AdaptiveState {
        decide(state, obs, cfg, &DefaultRampPolicy, at)
    }

    #[test]
    fn test_clean_conditions_ramp_to_ceiling_then_sustain() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);
        let obs = clean();

        // (max - initial) / increment = 18 intervals to reach 1000.
        for i in 1..=18u64 {
            state = step(&state, &obs, &cfg, i * 1_001);
            let expected = (100.0 + 50.0 * i as f64).min(1_000.0);
            assert_eq!(state.core.current_tps, expected, "interval {}", i);
            assert_eq!(state.core.phase, Phase::RampUp);
        }

        // Next interval observes the ceiling and sustains.
        state = step(&state, &obs, &cfg, 19 * 1_001);
        assert_eq!(state.core.phase, Phase::Sustain);
        assert_eq!(state.core.current_tps, 1_000.0);
    }

    #[test]
    fn test_errors_force_ramp_down_with_immediate_decrement() {
        let cfg = config();
        let state = AdaptiveState::initial(&cfg, 0);

        // First interval is clean: 100 -> 150.
        let state = step(&state, &clean(), &cfg, 1_001);
        assert_eq!(state.core.current_tps, 150.0);

        // Second interval sees 2% failures: back off to max(10, 150-100).
        let state = step(&state, &failing(0.02), &cfg, 2_002);
        assert_eq!(state.core.phase, Phase::RampDown);
        assert_eq!(state.core.current_tps, 50.0);
    }

    #[test]
    fn test_ramp_down_bottoms_out_into_recovery() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);
        let bad = failing(0.5);

        state = step(&state, &bad, &cfg, 1_001); // RampDown, 10 (100-100 floored)
        assert_eq!(state.core.phase, Phase::RampDown);
        assert_eq!(state.core.current_tps, 10.0);

        state = step(&state, &bad, &cfg, 2_002);
        assert_eq!(state.core.phase, Phase::Recovery);
        assert!(state.recovery.recovery_start_ms.is_some());
    }

    #[test]
    fn test_recovery_resumes_at_ratio_of_last_known_good() {
        let cfg = AdaptiveConfig::builder()
            .initial_tps(100.0)
            .min_tps(10.0)
            .max_tps(1_000.0)
            .recovery_tps_ratio(0.5)
            .build()
            .unwrap();

        let mut state = AdaptiveState::initial(&cfg, 0);
        state.core.phase = Phase::Recovery;
        state.core.current_tps = 10.0;
        state.recovery.last_known_good_tps = 200.0;
        state.recovery.recovery_start_ms = Some(5_000);

        let state = step(&state, &clean(), &cfg, 6_000);
        assert_eq!(state.core.phase, Phase::RampUp);
        assert_eq!(state.core.current_tps, 100.0);
        assert!(state.recovery.recovery_start_ms.is_none());
    }

    #[test]
    fn test_recovery_waits_for_lenient_conditions() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);
        state.core.phase = Phase::Recovery;
        state.core.current_tps = 10.0;

        let hostile = Observation {
            failure_rate: 0.9,
            recent_failure_rate: 0.9,
            backpressure: 0.9,
            total_executions: 100,
        };
        let state = step(&state, &hostile, &cfg, 10_000);
        assert_eq!(state.core.phase, Phase::Recovery);
        assert_eq!(state.core.current_tps, 10.0);
    }

    #[test]
    fn test_stability_latches_when_holding() {
        // Tolerance wider than the increment, so the candidate survives the
        // climb and the streak can build to the latch.
        let cfg_wide = AdaptiveConfig::builder()
            .initial_tps(100.0)
            .ramp_increment(2.0)
            .tps_tolerance(10.0)
            .stable_intervals_required(3)
            .max_tps(1_000.0)
            .min_tps(10.0)
            .build()
            .unwrap();

        let mut state = AdaptiveState::initial(&cfg_wide, 0);

        // Interval 1: candidate 100, streak 1, climb to 102.
        state = step(&state, &clean(), &cfg_wide, 1_001);
        assert_eq!(state.stability.consecutive_stable_intervals, 1);
        // Interval 2: 102 within tolerance of 100, streak 2, climb to 104.
        state = step(&state, &clean(), &cfg_wide, 2_002);
        assert_eq!(state.stability.consecutive_stable_intervals, 2);
        // Interval 3: streak 3 latches before the climb.
        state = step(&state, &clean(), &cfg_wide, 3_003);
        assert_eq!(state.core.phase, Phase::Sustain);
        assert_eq!(state.stability.stable_tps, Some(104.0));
    }

    #[test]
    fn test_stability_resets_on_bad_interval() {
        let cfg = AdaptiveConfig::builder()
            .initial_tps(100.0)
            .ramp_increment(2.0)
            .tps_tolerance(10.0)
            .stable_intervals_required(3)
            .max_tps(1_000.0)
            .min_tps(10.0)
            .build()
            .unwrap();

        let mut state = AdaptiveState::initial(&cfg, 0);
        state = step(&state, &clean(), &cfg, 1_001);
        state = step(&state, &clean(), &cfg, 2_002);
        assert_eq!(state.stability.consecutive_stable_intervals, 2);

        // A bad interval wipes the streak (and forces a back-off).
        state = step(&state, &failing(0.05), &cfg, 3_003);
        assert_eq!(state.stability.consecutive_stable_intervals, 0);
        assert!(state.stability.candidate_tps.is_none());
    }

    #[test]
    fn test_sustain_probes_up_after_duration() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);
        state.core.phase = Phase::Sustain;
        state.core.current_tps = 500.0;
        state.core.phase_start_ms = 0;

        // Before the sustain window elapses: hold.
        let held = step(&state, &clean(), &cfg, 5_000);
        assert_eq!(held.core.phase, Phase::Sustain);

        // After: probe upward again.
        let probing = step(&state, &clean(), &cfg, 10_000);
        assert_eq!(probing.core.phase, Phase::RampUp);
        assert_eq!(probing.core.current_tps, 500.0);
    }

    #[test]
    fn test_sustain_backs_off_when_conditions_worsen() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);
        state.core.phase = Phase::Sustain;
        state.core.current_tps = 500.0;

        let state = step(&state, &failing(0.1), &cfg, 3_000);
        assert_eq!(state.core.phase, Phase::RampDown);
        assert_eq!(state.core.current_tps, 400.0);
    }

    #[test]
    fn test_last_known_good_tracks_high_watermark() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);

        state = step(&state, &clean(), &cfg, 1_001); // good at 100 -> lkg 100, climb to 150
        state = step(&state, &clean(), &cfg, 2_002); // good at 150 -> lkg 150, climb to 200
        assert_eq!(state.recovery.last_known_good_tps, 150.0);

        // Bad interval: watermark is preserved through the back-off.
        state = step(&state, &failing(0.1), &cfg, 3_003);
        assert_eq!(state.recovery.last_known_good_tps, 150.0);
    }

    #[test]
    fn test_transition_count_increments_iff_phase_changes() {
        let cfg = config();
        let state = AdaptiveState::initial(&cfg, 0);

        let unchanged = step(&state, &clean(), &cfg, 1_001);
        assert_eq!(unchanged.core.phase_transition_count, 0);

        let changed = step(&unchanged, &failing(0.1), &cfg, 2_002);
        assert_eq!(changed.core.phase_transition_count, 1);
    }

    #[test]
    fn test_rate_stays_within_bounds() {
        let cfg = config();
        let mut state = AdaptiveState::initial(&cfg, 0);

        for i in 1..=100u64 {
            let obs = if i % 3 == 0 { failing(0.5) } else { clean() };
            state = step(&state, &obs, &cfg, i * 1_001);
            assert!(state.core.current_tps >= cfg.min_tps);
            assert!(state.core.current_tps <= cfg.max_tps);
        }
    }
}
