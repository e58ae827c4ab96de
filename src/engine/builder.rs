//! Engine builder.

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{BackpressureGate, ExecutionEngine};
use crate::backpressure::{BackpressureHandler, BackpressureProvider, QueueDepthProvider};
use crate::error::{Error, Result};
use crate::export::{ExporterPipeline, RunContext};
use crate::metrics::MetricsCollector;
use crate::pattern::LoadPattern;
use crate::task::Task;

const DEFAULT_BACKPRESSURE_THRESHOLD: f64 = 0.8;
const DEFAULT_MAX_QUEUE_DEPTH: u64 = 10_000;
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Assembles an [`ExecutionEngine`]. `task` and `load_pattern` are
/// required; everything else has a sensible default.
pub struct ExecutionEngineBuilder {
    task: Option<Arc<dyn Task>>,
    pattern: Option<Arc<dyn LoadPattern>>,
    collector: Option<Arc<MetricsCollector>>,
    backpressure_handler: Option<Arc<dyn BackpressureHandler>>,
    backpressure_provider: Option<Arc<dyn BackpressureProvider>>,
    backpressure_threshold: f64,
    max_queue_depth: u64,
    worker_cap: Option<usize>,
    grace_period: Duration,
    exporters: Option<ExporterPipeline>,
}

impl ExecutionEngineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            task: None,
            pattern: None,
            collector: None,
            backpressure_handler: None,
            backpressure_provider: None,
            backpressure_threshold: DEFAULT_BACKPRESSURE_THRESHOLD,
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            worker_cap: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            exporters: None,
        }
    }

    /// Sets the task to drive. Required.
    pub fn task(mut self, task: Arc<dyn Task>) -> Self {
        self.task = Some(task);
        self
    }

    /// Sets the load pattern. Required.
    pub fn load_pattern(mut self, pattern: Arc<dyn LoadPattern>) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Supplies a collector instead of the engine creating its own. Share
    /// the same collector with an adaptive pattern to close the feedback
    /// loop.
    pub fn metrics_collector(mut self, collector: Arc<MetricsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Enables the backpressure gate with the given handler.
    pub fn backpressure_handler(mut self, handler: Arc<dyn BackpressureHandler>) -> Self {
        self.backpressure_handler = Some(handler);
        self
    }

    /// Replaces the default queue-depth signal with a custom provider.
    pub fn backpressure_provider(mut self, provider: Arc<dyn BackpressureProvider>) -> Self {
        self.backpressure_provider = Some(provider);
        self
    }

    /// Pressure level in `[0, 1]` at which the handler starts being
    /// consulted. Default 0.8.
    pub fn backpressure_threshold(mut self, threshold: f64) -> Self {
        self.backpressure_threshold = threshold;
        self
    }

    /// Pending-work depth treated as saturation by the default queue-depth
    /// provider. Default 10 000.
    pub fn max_queue_depth(mut self, depth: u64) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Caps concurrently running workers. Unset means unbounded (paced only
    /// by the pattern and backpressure).
    pub fn worker_cap(mut self, workers: usize) -> Self {
        self.worker_cap = Some(workers);
        self
    }

    /// How long in-flight work may drain after stop before being cancelled.
    /// Default 30 s.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Attaches an exporter pipeline; the engine exports a final snapshot
    /// and, if the pipeline has an interval, periodic progress snapshots.
    pub fn exporter_pipeline(mut self, pipeline: ExporterPipeline) -> Self {
        self.exporters = Some(pipeline);
        self
    }

    /// Validates and assembles the engine.
    pub fn build(self) -> Result<ExecutionEngine> {
        let task = self.task.ok_or(Error::BuilderIncomplete("task"))?;
        let pattern = self.pattern.ok_or(Error::BuilderIncomplete("load pattern"))?;

        if !(0.0..=1.0).contains(&self.backpressure_threshold) {
            return Err(Error::config(format!(
                "backpressure threshold must be in [0, 1], got {}",
                self.backpressure_threshold
            )));
        }
        if self.max_queue_depth == 0 {
            return Err(Error::config("maxQueueDepth must be non-zero"));
        }
        if let Some(0) = self.worker_cap {
            return Err(Error::config("worker cap must be non-zero"));
        }

        let collector = self
            .collector
            .unwrap_or_else(|| Arc::new(MetricsCollector::new()));
        let pending = Arc::new(AtomicU64::new(0));

        let backpressure = self.backpressure_handler.map(|handler| {
            let provider = self.backpressure_provider.unwrap_or_else(|| {
                Arc::new(QueueDepthProvider::new(
                    Arc::clone(&pending),
                    self.max_queue_depth,
                ))
            });
            BackpressureGate {
                provider,
                handler,
                threshold: self.backpressure_threshold,
            }
        });

        let run_context = RunContext::new(task.name(), pattern.name());

        Ok(ExecutionEngine {
            task,
            pattern,
            collector,
            backpressure,
            worker_cap: self
                .worker_cap
                .map(|cap| Arc::new(tokio::sync::Semaphore::new(cap))),
            max_queue_depth: self.max_queue_depth,
            grace_period: self.grace_period,
            exporters: self.exporters.map(Arc::new),
            run_context,
            pending,
            recorded_in_flight: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        })
    }
}
