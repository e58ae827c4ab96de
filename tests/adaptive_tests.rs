//! Adaptive pattern behavior tests.
//!
//! This test suite drives the adaptive controller through scripted metrics
//! and backpressure providers:
//! 1. Clean-conditions ramp to the ceiling and sustain
//! 2. Error-triggered back-off
//! 3. Full degradation into recovery and the climb back out
//! 4. Backpressure-only feedback (no task failures at all)
//! 5. Listener event ordering

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use vajrapulse::backpressure::BackpressureProvider;
use vajrapulse::metrics::MetricsProvider;
use vajrapulse::pattern::adaptive::{
    AdaptiveConfig, AdaptiveEventListener, AdaptiveLoadPattern, Phase, PhaseTransitionEvent,
    RecoveryEvent, StabilityDetectedEvent, TpsChangeEvent,
};
use vajrapulse::pattern::LoadPattern;

// ============================================================================
// Scriptable providers
// ============================================================================

/// Metrics provider whose failure percentages are set by the test.
#[derive(Default)]
struct ScriptedMetrics {
    all_time_percent: Mutex<f64>,
    recent_percent: Mutex<f64>,
}

impl ScriptedMetrics {
    fn set(&self, all_time_percent: f64, recent_percent: f64) {
        *self.all_time_percent.lock() = all_time_percent;
        *self.recent_percent.lock() = recent_percent;
    }
}

impl MetricsProvider for ScriptedMetrics {
    fn failure_rate(&self) -> f64 {
        *self.all_time_percent.lock()
    }

    fn recent_failure_rate(&self, _window_secs: u64) -> f64 {
        *self.recent_percent.lock()
    }

    fn total_executions(&self) -> u64 {
        100_000
    }

    fn failure_count(&self) -> u64 {
        0
    }
}

/// Backpressure provider whose level is set by the test, in thousandths.
#[derive(Default)]
struct ScriptedBackpressure {
    level_millis: AtomicU64,
}

impl ScriptedBackpressure {
    fn set(&self, level: f64) {
        self.level_millis
            .store((level * 1_000.0) as u64, Ordering::SeqCst);
    }
}

impl BackpressureProvider for ScriptedBackpressure {
    fn level(&self) -> f64 {
        self.level_millis.load(Ordering::SeqCst) as f64 / 1_000.0
    }
}

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

/// Advances the pattern one decision interval at a time.
struct Clock {
    now_ms: u64,
}

impl Clock {
    fn new() -> Self {
        Self { now_ms: 0 }
    }

    fn tick(&mut self, pattern: &AdaptiveLoadPattern) -> f64 {
        let tps = pattern.tps(self.now_ms);
        self.now_ms += 1_001;
        tps
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn clean_conditions_ramp_to_ceiling_and_sustain() {
    let metrics = Arc::new(ScriptedMetrics::default());
    let pattern = AdaptiveLoadPattern::builder(config(), metrics).build();
    let mut clock = Clock::new();

    assert_eq!(clock.tick(&pattern), 100.0);

    // (max - initial) / increment intervals to reach the ceiling.
    let mut last = 100.0;
    for _ in 0..18 {
        last = clock.tick(&pattern);
    }
    assert_eq!(last, 1_000.0);

    // One more interval observes the ceiling and sustains.
    clock.tick(&pattern);
    let status = pattern.status();
    assert_eq!(status.phase, Phase::Sustain);
    assert_eq!(status.current_tps, 1_000.0);
}

#[test]
fn failures_trigger_back_off() {
    let metrics = Arc::new(ScriptedMetrics::default());
    let pattern = AdaptiveLoadPattern::builder(config(), Arc::clone(&metrics) as Arc<dyn MetricsProvider>).build();
    let mut clock = Clock::new();

    clock.tick(&pattern); // 100
    clock.tick(&pattern); // climbs to 150

    metrics.set(2.0, 2.0); // 2% failures, above the 1% threshold
    let tps = clock.tick(&pattern);
    assert_eq!(tps, 50.0);
    assert_eq!(pattern.status().phase, Phase::RampDown);
}

#[test]
fn degradation_parks_in_recovery_then_climbs_back() {
    let metrics = Arc::new(ScriptedMetrics::default());
    let backpressure = Arc::new(ScriptedBackpressure::default());
    let pattern = AdaptiveLoadPattern::builder(
        config(),
        Arc::clone(&metrics) as Arc<dyn MetricsProvider>,
    )
    .backpressure_provider(Arc::clone(&backpressure) as Arc<dyn BackpressureProvider>)
    .build();
    let mut clock = Clock::new();

    // Climb for a while under clean conditions: 100 -> 300.
    for _ in 0..5 {
        clock.tick(&pattern);
    }
    assert_eq!(pattern.status().current_tps, 300.0);

    // Sustained failures drive the rate to the floor and into recovery:
    // 300 -> 200 -> 100 -> floor.
    metrics.set(50.0, 50.0);
    for _ in 0..3 {
        clock.tick(&pattern);
    }
    let status = pattern.status();
    assert_eq!(status.phase, Phase::Recovery);
    assert_eq!(status.current_tps, 10.0);

    // Hostile conditions keep it parked.
    backpressure.set(0.9);
    clock.tick(&pattern);
    assert_eq!(pattern.status().phase, Phase::Recovery);

    // Recent health is clean and backpressure subsides: resume at half the
    // last known good rate. The all-time rate is still ruined, which is
    // exactly what the lenient recovery check tolerates.
    metrics.set(50.0, 0.0);
    backpressure.set(0.1);
    clock.tick(&pattern);
    let status = pattern.status();
    assert_eq!(status.phase, Phase::RampUp);
    assert_eq!(status.current_tps, 125.0); // max(10, 250 * 0.5)
}

#[test]
fn backpressure_alone_can_force_back_off() {
    let metrics = Arc::new(ScriptedMetrics::default());
    let backpressure = Arc::new(ScriptedBackpressure::default());
    let pattern = AdaptiveLoadPattern::builder(
        config(),
        Arc::clone(&metrics) as Arc<dyn MetricsProvider>,
    )
    .backpressure_provider(Arc::clone(&backpressure) as Arc<dyn BackpressureProvider>)
    .build();
    let mut clock = Clock::new();

    clock.tick(&pattern); // 100
    clock.tick(&pattern); // 150

    backpressure.set(0.85); // above the 0.8 ramp-down threshold
    let tps = clock.tick(&pattern);
    assert_eq!(tps, 50.0);
    assert_eq!(pattern.status().phase, Phase::RampDown);
}

// ============================================================================
// Listener ordering
// ============================================================================

#[derive(Default)]
struct EventLog {
    entries: Mutex<Vec<String>>,
}

impl AdaptiveEventListener for EventLog {
    fn on_phase_transition(&self, event: &PhaseTransitionEvent) {
        self.entries
            .lock()
            .push(format!("phase:{}->{}", event.from, event.to));
    }

    fn on_tps_change(&self, event: &TpsChangeEvent) {
        self.entries
            .lock()
            .push(format!("tps:{}->{}", event.previous_tps, event.new_tps));
    }

    fn on_stability_detected(&self, event: &StabilityDetectedEvent) {
        self.entries.lock().push(format!("stable:{}", event.stable_tps));
    }

    fn on_recovery(&self, event: &RecoveryEvent) {
        self.entries.lock().push(format!(
            "recovery:{}@{}",
            event.last_known_good_tps, event.recovery_tps
        ));
    }
}

#[test]
fn listeners_observe_transitions_in_order() {
    let metrics = Arc::new(ScriptedMetrics::default());
    let log = Arc::new(EventLog::default());
    let pattern = AdaptiveLoadPattern::builder(
        config(),
        Arc::clone(&metrics) as Arc<dyn MetricsProvider>,
    )
    .listener(Arc::clone(&log) as Arc<dyn AdaptiveEventListener>)
    .build();
    let mut clock = Clock::new();

    clock.tick(&pattern); // init, no events
    clock.tick(&pattern); // 100 -> 150
    metrics.set(5.0, 5.0);
    clock.tick(&pattern); // RampUp -> RampDown, 150 -> 50

    let entries = log.entries.lock().clone();
    assert_eq!(
        entries,
        vec![
            "tps:100->150".to_string(),
            "phase:RAMP_UP->RAMP_DOWN".to_string(),
            "tps:150->50".to_string(),
        ]
    );
}

#[test]
fn adaptive_pattern_is_indefinite_and_reports_status() {
    let pattern =
        AdaptiveLoadPattern::builder(config(), Arc::new(ScriptedMetrics::default())).build();
    assert!(pattern.is_indefinite());
    assert_eq!(pattern.name(), "adaptive");

    pattern.tps(0);
    let status = pattern.adaptive_status().unwrap();
    assert_eq!(status.phase, Phase::RampUp);
    assert_eq!(status.current_tps, 100.0);
}
