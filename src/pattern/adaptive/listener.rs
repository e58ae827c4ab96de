//! Adaptive controller events and listener fan-out.
//!
//! Listeners are observers, not owners: they receive event records on the
//! decision path, synchronously, and must not block. A listener that panics
//! is isolated and logged; the transition it observed still commits.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use super::state::{AdaptiveState, Phase};

/// Emitted on every phase change.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTransitionEvent {
    /// Phase before the transition.
    pub from: Phase,
    /// Phase after the transition.
    pub to: Phase,
    /// Target rate after the transition.
    pub tps: f64,
    /// Elapsed millis at the decision.
    pub elapsed_ms: u64,
}

/// Emitted on every target-rate change.
#[derive(Debug, Clone, Copy)]
pub struct TpsChangeEvent {
    /// Rate before the decision.
    pub previous_tps: f64,
    /// Rate after the decision.
    pub new_tps: f64,
    /// Phase after the decision.
    pub phase: Phase,
    /// Elapsed millis at the decision.
    pub elapsed_ms: u64,
}

/// Emitted when a stability streak latches.
#[derive(Debug, Clone, Copy)]
pub struct StabilityDetectedEvent {
    /// The latched stable rate.
    pub stable_tps: f64,
    /// Elapsed millis at the decision.
    pub elapsed_ms: u64,
}

/// Emitted when the controller climbs out of recovery.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryEvent {
    /// High watermark the resume rate was derived from.
    pub last_known_good_tps: f64,
    /// Rate the controller resumed at.
    pub recovery_tps: f64,
    /// Elapsed millis at the decision.
    pub elapsed_ms: u64,
}

/// Receives adaptive controller events. All callbacks default to no-ops;
/// implement only what you need. Callbacks run synchronously on the
/// decision path and must not block.
pub trait AdaptiveEventListener: Send + Sync {
    /// The controller changed phase.
    fn on_phase_transition(&self, event: &PhaseTransitionEvent) {
        let _ = event;
    }

    /// The controller changed its target rate.
    fn on_tps_change(&self, event: &TpsChangeEvent) {
        let _ = event;
    }

    /// The controller latched a stable rate.
    fn on_stability_detected(&self, event: &StabilityDetectedEvent) {
        let _ = event;
    }

    /// The controller resumed from the floor.
    fn on_recovery(&self, event: &RecoveryEvent) {
        let _ = event;
    }
}

/// One decision's worth of events, in emission order.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AdaptiveEvent {
    Phase(PhaseTransitionEvent),
    Tps(TpsChangeEvent),
    Stability(StabilityDetectedEvent),
    Recovery(RecoveryEvent),
}

/// Derives the events implied by a state transition.
pub(crate) fn diff_events(
    previous: &AdaptiveState,
    next: &AdaptiveState,
    elapsed_ms: u64,
) -> Vec<AdaptiveEvent> {
    let mut events = Vec::new();

    if previous.core.phase != next.core.phase {
        events.push(AdaptiveEvent::Phase(PhaseTransitionEvent {
            from: previous.core.phase,
            to: next.core.phase,
            tps: next.core.current_tps,
            elapsed_ms,
        }));
    }

    if previous.core.current_tps != next.core.current_tps {
        events.push(AdaptiveEvent::Tps(TpsChangeEvent {
            previous_tps: previous.core.current_tps,
            new_tps: next.core.current_tps,
            phase: next.core.phase,
            elapsed_ms,
        }));
    }

    let newly_latched = next.stability.stable_tps.is_some()
        && next.stability.stable_tps != previous.stability.stable_tps;
    if newly_latched {
        events.push(AdaptiveEvent::Stability(StabilityDetectedEvent {
            stable_tps: next.stability.stable_tps.expect("latched above"),
            elapsed_ms,
        }));
    }

    let recovered =
        previous.core.phase == Phase::Recovery && next.core.phase == Phase::RampUp;
    if recovered {
        events.push(AdaptiveEvent::Recovery(RecoveryEvent {
            last_known_good_tps: previous.recovery.last_known_good_tps,
            recovery_tps: next.core.current_tps,
            elapsed_ms,
        }));
    }

    events
}

/// Fans events out to listeners in registration order, isolating panics.
pub(crate) fn emit_all(listeners: &[Arc<dyn AdaptiveEventListener>], events: &[AdaptiveEvent]) {
    for event in events {
        for listener in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| match event {
                AdaptiveEvent::Phase(e) => listener.on_phase_transition(e),
                AdaptiveEvent::Tps(e) => listener.on_tps_change(e),
                AdaptiveEvent::Stability(e) => listener.on_stability_detected(e),
                AdaptiveEvent::Recovery(e) => listener.on_recovery(e),
            }));
            if result.is_err() {
                warn!("adaptive event listener panicked; transition committed anyway");
            }
        }
    }
}

/// Built-in listener that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl AdaptiveEventListener for LoggingListener {
    fn on_phase_transition(&self, event: &PhaseTransitionEvent) {
        tracing::info!(
            from = %event.from,
            to = %event.to,
            tps = event.tps,
            elapsed_ms = event.elapsed_ms,
            "phase transition"
        );
    }

    fn on_tps_change(&self, event: &TpsChangeEvent) {
        tracing::debug!(
            previous = event.previous_tps,
            new = event.new_tps,
            phase = %event.phase,
            "target rate changed"
        );
    }

    fn on_stability_detected(&self, event: &StabilityDetectedEvent) {
        tracing::info!(stable_tps = event.stable_tps, "stability detected");
    }

    fn on_recovery(&self, event: &RecoveryEvent) {
        tracing::info!(
            last_known_good = event.last_known_good_tps,
            resume_tps = event.recovery_tps,
            "recovering from minimum"
        );
    }
}
