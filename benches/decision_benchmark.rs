//! Benchmarks for the adaptive pattern's tps() paths: the cached hot path
//! the dispatch loop hits on every iteration, and the interval boundary
//! where a full decision runs.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use vajrapulse::metrics::MetricsProvider;
use vajrapulse::pattern::adaptive::{AdaptiveConfig, AdaptiveLoadPattern};
use vajrapulse::pattern::LoadPattern;

struct FlatMetrics;

impl MetricsProvider for FlatMetrics {
    fn failure_rate(&self) -> f64 {
        0.2
    }

    fn recent_failure_rate(&self, _window_secs: u64) -> f64 {
        0.1
    }

    fn total_executions(&self) -> u64 {
        1_000_000
    }

    fn failure_count(&self) -> u64 {
        2_000
    }
}

fn pattern() -> AdaptiveLoadPattern {
    let config = AdaptiveConfig::builder()
        .initial_tps(100.0)
        .max_tps(100_000.0)
        .ramp_interval(Duration::from_secs(1))
        .build()
        .unwrap();
    AdaptiveLoadPattern::builder(config, Arc::new(FlatMetrics)).build()
}

fn bench_cached_tps(c: &mut Criterion) {
    let pattern = pattern();
    pattern.tps(0);
    c.bench_function("adaptive_tps_cached", |b| b.iter(|| pattern.tps(500)));
}

fn bench_decision_interval(c: &mut Criterion) {
    let pattern = pattern();
    pattern.tps(0);
    let mut elapsed = 0u64;
    c.bench_function("adaptive_tps_decision", |b| {
        b.iter(|| {
            elapsed += 1_001;
            pattern.tps(elapsed)
        })
    });
}

criterion_group!(benches, bench_cached_tps, bench_decision_interval);
criterion_main!(benches);
