//! Built-in backpressure signal sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::BackpressureProvider;

/// Pressure from pending-work depth: `min(1, depth / max_depth)`.
pub struct QueueDepthProvider {
    depth: Arc<AtomicU64>,
    max_depth: u64,
}

impl QueueDepthProvider {
    /// Creates a provider over a shared depth gauge.
    pub fn new(depth: Arc<AtomicU64>, max_depth: u64) -> Self {
        Self {
            depth,
            max_depth: max_depth.max(1),
        }
    }
}

impl BackpressureProvider for QueueDepthProvider {
    fn level(&self) -> f64 {
        let depth = self.depth.load(Ordering::Relaxed);
        (depth as f64 / self.max_depth as f64).min(1.0)
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "queue depth {}/{}",
            self.depth.load(Ordering::Relaxed),
            self.max_depth
        ))
    }
}

/// Worst-of composition: the level is the max over all children.
pub struct CompositeProvider {
    providers: Vec<Arc<dyn BackpressureProvider>>,
}

impl CompositeProvider {
    /// Creates a composite over the given providers.
    pub fn new(providers: Vec<Arc<dyn BackpressureProvider>>) -> Self {
        Self { providers }
    }

    /// Adds a provider.
    pub fn with(mut self, provider: Arc<dyn BackpressureProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

impl BackpressureProvider for CompositeProvider {
    fn level(&self) -> f64 {
        self.providers
            .iter()
            .map(|p| p.level())
            .fold(0.0, f64::max)
            .clamp(0.0, 1.0)
    }

    fn description(&self) -> Option<String> {
        let parts: Vec<String> = self
            .providers
            .iter()
            .filter_map(|p| p.description())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Pressure from worker-pool utilisation.
///
/// Below `utilisation_threshold` the pool is considered healthy and the
/// level is 0; above it the level grows linearly to 1 at full utilisation:
/// `max(0, (util - threshold) / (1 - threshold))`.
pub struct PoolUtilisationProvider {
    active: Arc<AtomicU64>,
    pool_size: u64,
    utilisation_threshold: f64,
}

impl PoolUtilisationProvider {
    /// Creates a provider over a shared active-worker gauge.
    pub fn new(active: Arc<AtomicU64>, pool_size: u64, utilisation_threshold: f64) -> Self {
        Self {
            active,
            pool_size: pool_size.max(1),
            utilisation_threshold: utilisation_threshold.clamp(0.0, 0.99),
        }
    }
}

impl BackpressureProvider for PoolUtilisationProvider {
    fn level(&self) -> f64 {
        let util = self.active.load(Ordering::Relaxed) as f64 / self.pool_size as f64;
        let scaled = (util - self.utilisation_threshold) / (1.0 - self.utilisation_threshold);
        scaled.clamp(0.0, 1.0)
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "pool utilisation {}/{}",
            self.active.load(Ordering::Relaxed),
            self.pool_size
        ))
    }
}

/// Source of a recent high-percentile latency observation, in milliseconds.
pub trait LatencySource: Send + Sync {
    /// A recent P95-style latency in milliseconds.
    fn recent_latency_ms(&self) -> f64;
}

impl<F> LatencySource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn recent_latency_ms(&self) -> f64 {
        self()
    }
}

/// Pressure from latency overshoot against a target:
/// `min(1, max(0, (latency - target) / target))`.
pub struct LatencyProvider {
    source: Arc<dyn LatencySource>,
    target_ms: f64,
}

impl LatencyProvider {
    /// Creates a provider comparing `source` against `target_ms`.
    pub fn new(source: Arc<dyn LatencySource>, target_ms: f64) -> Self {
        Self {
            source,
            target_ms: target_ms.max(f64::MIN_POSITIVE),
        }
    }
}

impl BackpressureProvider for LatencyProvider {
    fn level(&self) -> f64 {
        let latency = self.source.recent_latency_ms();
        ((latency - self.target_ms) / self.target_ms).clamp(0.0, 1.0)
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "latency {:.1}ms against target {:.1}ms",
            self.source.recent_latency_ms(),
            self.target_ms
        ))
    }
}
