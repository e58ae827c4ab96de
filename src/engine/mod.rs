//! The execution engine: the outer loop that drives everything.
//!
//! One dispatch loop asks the pattern for a target rate, lets the rate
//! controller pace it, filters through the backpressure gate, and hands the
//! work to a spawned worker. Workers run the task body, record the outcome,
//! and maintain the pending-work gauge. Shutdown stops dispatch, drains
//! in-flight work for a bounded grace period, then cancels what remains.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = ExecutionEngine::builder()
//!     .task(Arc::new(PingTask))
//!     .load_pattern(Arc::new(StaticLoad::new(100.0, Duration::from_secs(60))?))
//!     .build()?;
//! let summary = engine.run().await?;
//! println!("{} executions", summary.snapshot.total_executions);
//! ```

mod builder;

pub use builder::ExecutionEngineBuilder;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backpressure::{
    BackpressureContext, BackpressureDecision, BackpressureHandler, BackpressureProvider,
};
use crate::error::{Error, Result};
use crate::export::{ExporterPipeline, RunContext};
use crate::metrics::{ExecutionRecord, MetricsCollector, MetricsSnapshot};
use crate::pattern::{duration_ms, LoadPattern};
use crate::rate::RateController;
use crate::task::{Task, TaskError, TaskResult};

/// Backpressure wiring: signal source, disposition handler, and the level
/// at which the handler starts being consulted.
pub(crate) struct BackpressureGate {
    pub(crate) provider: Arc<dyn BackpressureProvider>,
    pub(crate) handler: Arc<dyn BackpressureHandler>,
    pub(crate) threshold: f64,
}

/// What a completed run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Final metrics, with adaptive status attached when applicable.
    pub snapshot: MetricsSnapshot,
    /// Schedule slots the dispatch loop could not honour.
    pub missed_deadlines: u64,
    /// Wall-clock time from first dispatch to drain completion.
    pub wall_clock: Duration,
}

/// Cancellation handle for a running engine. Cloneable; `stop` is
/// idempotent.
#[derive(Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Requests the run to stop. Dispatch halts at the next loop check;
    /// in-flight work drains under the grace period.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// Drives a [`Task`] at the rate prescribed by a [`LoadPattern`].
pub struct ExecutionEngine {
    pub(crate) task: Arc<dyn Task>,
    pub(crate) pattern: Arc<dyn LoadPattern>,
    pub(crate) collector: Arc<MetricsCollector>,
    pub(crate) backpressure: Option<BackpressureGate>,
    pub(crate) worker_cap: Option<Arc<tokio::sync::Semaphore>>,
    pub(crate) max_queue_depth: u64,
    pub(crate) grace_period: Duration,
    pub(crate) exporters: Option<Arc<ExporterPipeline>>,
    pub(crate) run_context: RunContext,
    pub(crate) pending: Arc<AtomicU64>,
    pub(crate) recorded_in_flight: Arc<AtomicU64>,
    pub(crate) cancel: CancellationToken,
    pub(crate) started: AtomicBool,
}

impl ExecutionEngine {
    /// Starts building an engine.
    pub fn builder() -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new()
    }

    /// The collector this engine records into.
    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.collector)
    }

    /// A handle that can stop the run from anywhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.cancel.clone(),
        }
    }

    /// Requests the run to stop. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Runs the load test to completion: pattern duration elapsed or an
    /// external stop. Returns an error only for a second `run` call or a
    /// failed `Task::setup`; task failures are data in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        info!(
            task = self.task.name(),
            pattern = self.pattern.name(),
            run_id = %self.run_context.run_id,
            "starting load run"
        );

        self.task
            .setup()
            .await
            .map_err(|e| Error::Setup(e.to_string()))?;

        let summary = self.dispatch_loop().await;

        // Cleanup runs exactly once, on every exit path past setup.
        if let Err(error) = self.task.cleanup().await {
            warn!(%error, "task cleanup failed");
        }

        if let Some(pipeline) = &self.exporters {
            pipeline
                .export_all("Load Test Results", &summary.snapshot, Some(&self.run_context))
                .await;
        }

        info!(
            total = summary.snapshot.total_executions,
            failures = summary.snapshot.failure_count,
            missed_deadlines = summary.missed_deadlines,
            "load run complete"
        );
        Ok(summary)
    }

    async fn dispatch_loop(&self) -> RunSummary {
        let run_started = Instant::now();
        let mut rate = RateController::new();
        rate.start();

        let mut workers: JoinSet<()> = JoinSet::new();
        let mut iteration: u64 = 0;
        let pattern_end_ms = duration_ms(self.pattern.duration());
        let indefinite = self.pattern.is_indefinite();

        let tick_task = self.spawn_export_tick();

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let elapsed = rate.elapsed_ms();
            if !indefinite && elapsed >= pattern_end_ms {
                break;
            }

            let target_tps = self.pattern.tps(elapsed);
            let should_record = self.pattern.should_record_metrics(elapsed);

            let elapsed = tokio::select! {
                _ = self.cancel.cancelled() => break,
                elapsed = rate.wait_for_next(target_tps) => elapsed,
            };
            if !indefinite && elapsed >= pattern_end_ms {
                break;
            }

            // Reap finished workers so the join set stays bounded.
            while workers.try_join_next().is_some() {}

            if !self.admit(iteration, should_record) {
                iteration += 1;
                continue;
            }

            let permit = match &self.worker_cap {
                Some(semaphore) => {
                    let acquired = tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        permit = Arc::clone(semaphore).acquire_owned() => permit,
                    };
                    Some(acquired.expect("worker semaphore is never closed"))
                }
                None => None,
            };

            self.submit(&mut workers, iteration, should_record, permit);
            iteration += 1;
        }

        self.drain(&mut workers).await;

        if let Some(tick) = tick_task {
            tick.abort();
        }

        let mut snapshot = self.collector.snapshot();
        snapshot.adaptive = self.pattern.adaptive_status();
        RunSummary {
            snapshot,
            missed_deadlines: rate.missed_deadlines(),
            wall_clock: run_started.elapsed(),
        }
    }

    /// Applies the backpressure gate. Returns false when the submission was
    /// consumed (dropped or rejected) and must not be dispatched.
    fn admit(&self, iteration: u64, should_record: bool) -> bool {
        let Some(gate) = &self.backpressure else {
            return true;
        };

        let level = gate.provider.level();
        if level < gate.threshold {
            return true;
        }

        let context = BackpressureContext {
            queue_depth: self.pending.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth,
            iteration,
        };
        match gate.handler.handle(level, &context) {
            BackpressureDecision::Accepted | BackpressureDecision::Queued => true,
            BackpressureDecision::Dropped => {
                debug!(level, iteration, "submission dropped under backpressure");
                self.collector.record_dropped();
                false
            }
            BackpressureDecision::Rejected => {
                debug!(level, iteration, "submission rejected under backpressure");
                self.collector.record_rejected();
                if should_record {
                    self.collector.record_rejection_failure();
                }
                false
            }
        }
    }

    /// Hands one submission to a worker.
    fn submit(
        &self,
        workers: &mut JoinSet<()>,
        iteration: u64,
        should_record: bool,
        permit: Option<tokio::sync::OwnedSemaphorePermit>,
    ) {
        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        self.collector.update_queue_size(depth);
        if should_record {
            self.collector.record_submitted();
            self.recorded_in_flight.fetch_add(1, Ordering::SeqCst);
        }

        let task = Arc::clone(&self.task);
        let collector = Arc::clone(&self.collector);
        let pending = Arc::clone(&self.pending);
        let recorded_in_flight = Arc::clone(&self.recorded_in_flight);
        let submitted_at = Instant::now();

        workers.spawn(async move {
            let _permit = permit;
            let started_at = Instant::now();

            let outcome = match AssertUnwindSafe(task.execute(iteration))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => TaskResult::failure(TaskError::panic("task body panicked")),
            };
            let completed_at = Instant::now();

            if should_record {
                collector.record(&ExecutionRecord {
                    submitted_at,
                    started_at,
                    completed_at,
                    outcome,
                    iteration,
                });
                recorded_in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            let depth = pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
            collector.update_queue_size(depth);
        });
    }

    /// Waits out in-flight work under the grace period, then cancels the
    /// rest and accounts the cancellations as failures.
    async fn drain(&self, workers: &mut JoinSet<()>) {
        let drained = timeout(self.grace_period, async {
            while workers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            let cancelled_recorded = self.recorded_in_flight.swap(0, Ordering::SeqCst);
            warn!(
                cancelled = cancelled_recorded,
                grace = ?self.grace_period,
                "grace period expired, cancelling in-flight work"
            );
            workers.shutdown().await;
            for _ in 0..cancelled_recorded {
                self.collector.record_cancelled();
            }
            self.pending.store(0, Ordering::SeqCst);
            self.collector.update_queue_size(0);
        }
    }

    /// Spawns the periodic export tick, when the pipeline opted into one.
    fn spawn_export_tick(&self) -> Option<tokio::task::JoinHandle<()>> {
        let pipeline = self.exporters.as_ref()?;
        let every = pipeline.interval()?;

        let pipeline = Arc::clone(pipeline);
        let collector = Arc::clone(&self.collector);
        let context = self.run_context.clone();
        let cancel = self.cancel.child_token();
        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tick.tick().await; // immediate first tick is not a report
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        pipeline
                            .export_all("Progress", &collector.snapshot(), Some(&context))
                            .await;
                    }
                }
            }
        }))
    }
}
