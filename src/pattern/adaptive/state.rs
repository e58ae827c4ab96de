//! Adaptive controller state.

use std::fmt;

use serde::Serialize;

use super::config::AdaptiveConfig;

/// Controller phase. The set is closed and has no terminal member: a
/// controller that bottoms out enters [`Phase::Recovery`] rather than
/// stopping, so it can always re-enter [`Phase::RampUp`] when conditions
/// improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Probing upward toward the highest safe rate.
    RampUp,
    /// Backing off in response to errors or backpressure.
    RampDown,
    /// Holding a level that has proven stable or hit the ceiling.
    Sustain,
    /// Parked at the floor after a full back-off, waiting for conditions
    /// lenient enough to climb again.
    Recovery,
}

impl Phase {
    /// Stable ordinal for serialized reports.
    pub fn ordinal(&self) -> u8 {
        match self {
            Phase::RampUp => 0,
            Phase::RampDown => 1,
            Phase::Sustain => 2,
            Phase::Recovery => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::RampUp => write!(f, "RAMP_UP"),
            Phase::RampDown => write!(f, "RAMP_DOWN"),
            Phase::Sustain => write!(f, "SUSTAIN"),
            Phase::Recovery => write!(f, "RECOVERY"),
        }
    }
}

/// Core controller position.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreState {
    /// Current phase.
    pub phase: Phase,
    /// Current target rate.
    pub current_tps: f64,
    /// Elapsed millis of the most recent decision.
    pub last_adjustment_ms: u64,
    /// Elapsed millis when the current phase was entered.
    pub phase_start_ms: u64,
    /// Total phase transitions since creation.
    pub phase_transition_count: u64,
}

/// Stability detection bookkeeping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StabilityTracking {
    /// Candidate rate being evaluated for stability, if any.
    pub candidate_tps: Option<f64>,
    /// Elapsed millis when the candidate was first observed.
    pub stable_since_ms: Option<u64>,
    /// Good intervals observed at the candidate so far.
    pub consecutive_stable_intervals: u32,
    /// Rate latched once stability was sustained.
    pub stable_tps: Option<f64>,
}

impl StabilityTracking {
    /// Clears the in-progress candidate, keeping any latched stable rate.
    pub fn reset_candidate(&mut self) {
        self.candidate_tps = None;
        self.stable_since_ms = None;
        self.consecutive_stable_intervals = 0;
    }
}

/// Recovery bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryTracking {
    /// Highest rate observed under good conditions.
    pub last_known_good_tps: f64,
    /// Elapsed millis when the current recovery began, if one is underway.
    pub recovery_start_ms: Option<u64>,
}

/// The complete adaptive state, updated atomically as one record on each
/// decision.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveState {
    /// Core position.
    pub core: CoreState,
    /// Stability detection.
    pub stability: StabilityTracking,
    /// Recovery tracking.
    pub recovery: RecoveryTracking,
}

impl AdaptiveState {
    /// The state a freshly created controller starts in.
    pub fn initial(config: &AdaptiveConfig, elapsed_ms: u64) -> Self {
        Self {
            core: CoreState {
                phase: Phase::RampUp,
                current_tps: config.initial_tps,
                last_adjustment_ms: elapsed_ms,
                phase_start_ms: elapsed_ms,
                phase_transition_count: 0,
            },
            stability: StabilityTracking::default(),
            recovery: RecoveryTracking {
                last_known_good_tps: config.initial_tps,
                recovery_start_ms: None,
            },
        }
    }

    /// Moves to `phase`, updating the transition bookkeeping iff the phase
    /// actually changes.
    pub(crate) fn set_phase(&mut self, phase: Phase, elapsed_ms: u64) {
        if self.core.phase != phase {
            self.core.phase = phase;
            self.core.phase_start_ms = elapsed_ms;
            self.core.phase_transition_count += 1;
        }
    }
}
