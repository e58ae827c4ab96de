//! The adaptive load pattern: a metrics-driven feedback controller.
//!
//! The controller probes upward while conditions are good, backs off when
//! error rates or backpressure cross their thresholds, latches a stable
//! rate when one proves itself, and parks at the floor — never terminally —
//! when a full back-off bottoms out.
//!
//! # Structure
//!
//! - [`AdaptiveConfig`] — validated knobs.
//! - [`AdaptiveState`] — one composite record (core position, stability
//!   tracking, recovery tracking), swapped whole on each decision.
//! - [`RampDecisionPolicy`] — the pluggable judgment calls;
//!   [`DefaultRampPolicy`] implements the stock rules.
//! - `decision` — the pure `(state, observation) → state` function.
//! - [`AdaptiveEventListener`] — observers notified on the decision path.
//!
//! # Caching
//!
//! Metrics are consulted at most once per ramp interval. Between interval
//! boundaries, `tps()` is two atomic loads; the engine can poll it at
//! dispatch frequency without amplifying load on the metrics collector.

mod config;
mod decision;
mod listener;
mod policy;
mod state;

pub use config::{AdaptiveConfig, AdaptiveConfigBuilder};
pub use listener::{
    AdaptiveEventListener, LoggingListener, PhaseTransitionEvent, RecoveryEvent,
    StabilityDetectedEvent, TpsChangeEvent,
};
pub use policy::{DefaultRampPolicy, Observation, RampDecisionPolicy};
pub use state::{AdaptiveState, CoreState, Phase, RecoveryTracking, StabilityTracking};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backpressure::BackpressureProvider;
use crate::metrics::{AdaptiveStatus, MetricsProvider};
use crate::pattern::{LoadPattern, INDEFINITE};

/// Sentinel for "no decision has been taken yet".
const UNINITIALIZED: u64 = u64::MAX;

/// A load pattern that adjusts its target rate from live metrics and
/// backpressure signals.
pub struct AdaptiveLoadPattern {
    config: AdaptiveConfig,
    metrics: Arc<dyn MetricsProvider>,
    backpressure: Option<Arc<dyn BackpressureProvider>>,
    policy: Arc<dyn RampDecisionPolicy>,
    listeners: Vec<Arc<dyn AdaptiveEventListener>>,

    // Full state lives behind the lock and is only touched on interval
    // boundaries; the two atomics serve every other tps() call.
    state: Mutex<Option<AdaptiveState>>,
    cached_tps: AtomicU64,
    last_adjustment_ms: AtomicU64,
}

impl AdaptiveLoadPattern {
    /// Starts building an adaptive pattern over a metrics provider.
    pub fn builder(
        config: AdaptiveConfig,
        metrics: Arc<dyn MetricsProvider>,
    ) -> AdaptiveLoadPatternBuilder {
        AdaptiveLoadPatternBuilder {
            config,
            metrics,
            backpressure: None,
            policy: Arc::new(DefaultRampPolicy),
            listeners: Vec::new(),
        }
    }

    /// Current controller status.
    pub fn status(&self) -> AdaptiveStatus {
        let guard = self.state.lock();
        match guard.as_ref() {
            Some(state) => AdaptiveStatus {
                phase: state.core.phase,
                current_tps: state.core.current_tps,
                stable_tps: state.stability.stable_tps,
                phase_transitions: state.core.phase_transition_count,
            },
            None => AdaptiveStatus {
                phase: Phase::RampUp,
                current_tps: self.config.initial_tps,
                stable_tps: None,
                phase_transitions: 0,
            },
        }
    }

    /// End of the optional warm-in window in elapsed millis, 0 when unset.
    fn warm_in_end_ms(&self) -> u64 {
        self.config
            .initial_ramp_duration
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Builds this interval's observation, normalising provider percentages
    /// to ratios exactly once.
    fn observe(&self) -> Observation {
        let backpressure = self
            .backpressure
            .as_ref()
            .map(|p| p.level().clamp(0.0, 1.0))
            .unwrap_or(0.0);
        Observation {
            failure_rate: self.metrics.failure_rate() / 100.0,
            recent_failure_rate: self
                .metrics
                .recent_failure_rate(self.config.recent_window_secs)
                / 100.0,
            backpressure,
            total_executions: self.metrics.total_executions(),
        }
    }

    fn decide_and_cache(&self, elapsed_ms: u64) -> f64 {
        let mut guard = self.state.lock();

        // Another caller may have taken this interval's decision while we
        // waited on the lock.
        if let Some(state) = guard.as_ref() {
            if elapsed_ms.saturating_sub(state.core.last_adjustment_ms)
                < self.config.ramp_interval_ms()
            {
                return state.core.current_tps;
            }
        }

        let (next, events) = match guard.as_ref() {
            None => (AdaptiveState::initial(&self.config, elapsed_ms), Vec::new()),
            Some(previous) => {
                let observation = self.observe();
                let next = decision::decide(
                    previous,
                    &observation,
                    &self.config,
                    self.policy.as_ref(),
                    elapsed_ms,
                );
                let events = listener::diff_events(previous, &next, elapsed_ms);
                (next, events)
            }
        };

        let tps = next.core.current_tps;
        self.cached_tps.store(tps.to_bits(), Ordering::Release);
        self.last_adjustment_ms.store(elapsed_ms, Ordering::Release);
        *guard = Some(next);
        drop(guard);

        // Listeners run outside the lock so a slow or re-entrant listener
        // cannot stall the decision path.
        listener::emit_all(&self.listeners, &events);
        tps
    }
}

impl LoadPattern for AdaptiveLoadPattern {
    fn tps(&self, elapsed_ms: u64) -> f64 {
        let warm_in_end = self.warm_in_end_ms();
        if elapsed_ms < warm_in_end {
            return self.config.initial_tps * (elapsed_ms as f64 / warm_in_end as f64);
        }

        let last = self.last_adjustment_ms.load(Ordering::Acquire);
        if last != UNINITIALIZED
            && elapsed_ms.saturating_sub(last) < self.config.ramp_interval_ms()
        {
            return f64::from_bits(self.cached_tps.load(Ordering::Acquire));
        }

        self.decide_and_cache(elapsed_ms)
    }

    fn duration(&self) -> Duration {
        INDEFINITE
    }

    fn name(&self) -> &str {
        "adaptive"
    }

    fn adaptive_status(&self) -> Option<AdaptiveStatus> {
        Some(self.status())
    }
}

/// Builder for [`AdaptiveLoadPattern`].
pub struct AdaptiveLoadPatternBuilder {
    config: AdaptiveConfig,
    metrics: Arc<dyn MetricsProvider>,
    backpressure: Option<Arc<dyn BackpressureProvider>>,
    policy: Arc<dyn RampDecisionPolicy>,
    listeners: Vec<Arc<dyn AdaptiveEventListener>>,
}

impl AdaptiveLoadPatternBuilder {
    /// Wires a backpressure provider into the feedback loop.
    pub fn backpressure_provider(mut self, provider: Arc<dyn BackpressureProvider>) -> Self {
        self.backpressure = Some(provider);
        self
    }

    /// Replaces the default ramp decision policy.
    pub fn policy(mut self, policy: Arc<dyn RampDecisionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a listener; listeners are notified in registration order.
    pub fn listener(mut self, listener: Arc<dyn AdaptiveEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the pattern.
    pub fn build(self) -> AdaptiveLoadPattern {
        AdaptiveLoadPattern {
            config: self.config,
            metrics: self.metrics,
            backpressure: self.backpressure,
            policy: self.policy,
            listeners: self.listeners,
            state: Mutex::new(None),
            cached_tps: AtomicU64::new(0),
            last_adjustment_ms: AtomicU64::new(UNINITIALIZED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Scriptable metrics provider: failure rates are settable percentages.
    #[derive(Default)]
    struct StubMetrics {
        failure_percent: Mutex<f64>,
        queries: AtomicUsize,
    }

    impl StubMetrics {
        fn set_failure_percent(&self, percent: f64) {
            *self.failure_percent.lock() = percent;
        }
    }

    impl MetricsProvider for StubMetrics {
        fn failure_rate(&self) -> f64 {
            self.queries.fetch_add(1, Ordering::SeqCst);
            *self.failure_percent.lock()
        }

        fn recent_failure_rate(&self, _window_secs: u64) -> f64 {
            *self.failure_percent.lock()
        }

        fn total_executions(&self) -> u64 {
            10_000
        }

        fn failure_count(&self) -> u64 {
            0
        }
    }

    fn pattern_with(metrics: Arc<StubMetrics>) -> AdaptiveLoadPattern {
        let config = AdaptiveConfig::builder()
            .initial_tps(100.0)
            .ramp_increment(50.0)
            .ramp_decrement(100.0)
            .ramp_interval(Duration::from_secs(1))
            .max_tps(1_000.0)
            .min_tps(10.0)
            .error_threshold(0.01)
            .build()
            .unwrap();
        AdaptiveLoadPattern::builder(config, metrics).build()
    }

    #[test]
    fn test_first_call_returns_initial_tps() {
        let pattern = pattern_with(Arc::new(StubMetrics::default()));
        assert_eq!(pattern.tps(0), 100.0);
        assert_eq!(pattern.status().phase, Phase::RampUp);
    }

    #[test]
    fn test_ramps_on_interval_boundaries() {
        let pattern = pattern_with(Arc::new(StubMetrics::default()));
        assert_eq!(pattern.tps(0), 100.0);
        assert_eq!(pattern.tps(1_001), 150.0);
        assert_eq!(pattern.tps(2_002), 200.0);
    }

    #[test]
    fn test_intermediate_calls_are_cached() {
        let metrics = Arc::new(StubMetrics::default());
        let pattern = pattern_with(Arc::clone(&metrics));

        pattern.tps(0);
        let after_init = metrics.queries.load(Ordering::SeqCst);
        // Hundreds of calls inside the interval must not touch the provider.
        for t in 1..500 {
            assert_eq!(pattern.tps(t), 100.0);
        }
        assert_eq!(metrics.queries.load(Ordering::SeqCst), after_init);
    }

    #[test]
    fn test_errors_drive_ramp_down() {
        let metrics = Arc::new(StubMetrics::default());
        let pattern = pattern_with(Arc::clone(&metrics));

        pattern.tps(0);
        pattern.tps(1_001); // climbs to 150
        metrics.set_failure_percent(2.0); // provider speaks percent
        assert_eq!(pattern.tps(2_002), 50.0);
        assert_eq!(pattern.status().phase, Phase::RampDown);
    }

    #[test]
    fn test_warm_in_window() {
        let config = AdaptiveConfig::builder()
            .initial_tps(100.0)
            .initial_ramp_duration(Duration::from_secs(10))
            .build()
            .unwrap();
        let pattern =
            AdaptiveLoadPattern::builder(config, Arc::new(StubMetrics::default())).build();

        assert_eq!(pattern.tps(0), 0.0);
        assert!((pattern.tps(5_000) - 50.0).abs() < f64::EPSILON);
        // Warm-in over: the controller takes over at the initial rate.
        assert_eq!(pattern.tps(10_000), 100.0);
    }

    #[test]
    fn test_listener_receives_tps_changes() {
        #[derive(Default)]
        struct Recorder {
            changes: AtomicUsize,
        }
        impl AdaptiveEventListener for Recorder {
            fn on_tps_change(&self, _event: &TpsChangeEvent) {
                self.changes.fetch_add(1, Ordering::SeqCst);
            }
        }

        let recorder = Arc::new(Recorder::default());
        let config = AdaptiveConfig::builder().max_tps(1_000.0).build().unwrap();
        let pattern = AdaptiveLoadPattern::builder(config, Arc::new(StubMetrics::default()))
            .listener(Arc::clone(&recorder) as Arc<dyn AdaptiveEventListener>)
            .build();

        pattern.tps(0);
        pattern.tps(1_001);
        pattern.tps(2_002);
        assert_eq!(recorder.changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_status_reports_through_load_pattern_capability() {
        let pattern = pattern_with(Arc::new(StubMetrics::default()));
        pattern.tps(0);
        let status = LoadPattern::adaptive_status(&pattern).unwrap();
        assert_eq!(status.current_tps, 100.0);
        assert_eq!(status.phase_transitions, 0);
    }

    #[test]
    fn test_indefinite_duration() {
        let pattern = pattern_with(Arc::new(StubMetrics::default()));
        assert!(pattern.is_indefinite());
    }
}
