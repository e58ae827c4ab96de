//! # VajraPulse - A Programmable Load-Generation Framework
//!
//! VajraPulse drives a user-supplied task at a prescribed throughput curve,
//! measures latency and outcomes, and can feed the measurements back into
//! the curve so it adapts to what the system under test can actually take.
//!
//! ## Core Concepts
//!
//! - **Task**: the unit of work to repeat under load (`setup` / `execute` /
//!   `cleanup`)
//! - **Load Pattern**: a target-TPS curve over time (static, ramp, step,
//!   spike, sine, warm-up wrapper, adaptive)
//! - **Rate Controller**: converts the curve into paced inter-arrival delays
//! - **Backpressure**: scalar pressure signals and per-submission
//!   accept/queue/drop/reject decisions
//! - **Metrics Collector**: lock-cheap counters, HdrHistogram latency
//!   series, and immutable snapshots
//! - **Exporters**: console, CSV, JSON, and HTML reports fed from snapshots
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Execution Engine                              │
//! │        (single dispatch loop, tokio-spawned worker pool)             │
//! └─────────────────────────────────────────────────────────────────────┘
//!       │                  │                    │                │
//!       ▼                  ▼                    ▼                ▼
//! ┌───────────┐   ┌─────────────────┐   ┌──────────────┐   ┌──────────┐
//! │   Load    │   │ Rate Controller │   │ Backpressure │   │   Task   │
//! │  Pattern  │   │ (deadline paced)│   │   Gate       │   │ (yours)  │
//! └───────────┘   └─────────────────┘   └──────────────┘   └──────────┘
//!       ▲                                      ▲                │
//!       │          ┌───────────────────────────┘                │
//!       │          │                                            ▼
//! ┌─────┴──────────┴──────────────────────────────────────────────────┐
//! │                       Metrics Collector                            │
//! │   (counters, latency histograms, queue gauge, sliding window)      │
//! └────────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │               Exporters (console / CSV / JSON / HTML)               │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The adaptive pattern closes the loop: it reads the collector's provider
//! view and the backpressure signal once per ramp interval and moves its
//! target rate through a RAMP_UP / RAMP_DOWN / SUSTAIN / RECOVERY state
//! machine.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use vajrapulse::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pattern = StaticLoad::new(100.0, Duration::from_secs(60))?;
//!
//!     let engine = ExecutionEngine::builder()
//!         .task(Arc::new(MyTask::new()))
//!         .load_pattern(Arc::new(pattern))
//!         .exporter_pipeline(
//!             ExporterPipeline::new().with_exporter(Arc::new(ConsoleExporter::new())),
//!         )
//!         .build()?;
//!
//!     let summary = engine.run().await?;
//!     println!("p99: {:?} ms", summary.snapshot.success_latency.percentile_ms(0.99));
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use std::sync::Arc;
    pub use std::time::Duration;

    pub use async_trait::async_trait;

    // Error handling
    pub use crate::error::{Error, Result};

    // Task contract
    pub use crate::task::{Task, TaskError, TaskErrorKind, TaskResult};

    // Execution engine
    pub use crate::engine::{ExecutionEngine, ExecutionEngineBuilder, RunSummary, StopHandle};

    // Load patterns
    pub use crate::pattern::adaptive::{
        AdaptiveConfig, AdaptiveEventListener, AdaptiveLoadPattern, DefaultRampPolicy,
        LoggingListener, Phase,
    };
    pub use crate::pattern::{
        LoadPattern, LoadPhase, RampUpLoad, RampUpToMaxLoad, SineWaveLoad, SpikeLoad, StaticLoad,
        Step, StepLoad, WarmupCooldownPattern,
    };

    // Metrics
    pub use crate::metrics::{
        MetricsCollector, MetricsProvider, MetricsSnapshot,
    };

    // Backpressure
    pub use crate::backpressure::{
        BackpressureDecision, BackpressureHandler, BackpressureProvider, DropHandler,
        QueueHandler, RejectHandler, ThresholdHandler,
    };

    // Exporters
    pub use crate::export::{
        ConsoleExporter, CsvReportExporter, ExporterPipeline, HtmlReportExporter,
        JsonReportExporter, MetricsExporter, RunContext,
    };
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for VajraPulse operations.
pub mod error;

/// The task contract: the unit of work a load test repeats.
pub mod task;

/// Deadline-based pacing of the dispatch loop.
pub mod rate;

/// Load patterns: target-throughput curves over time, including the
/// adaptive feedback controller.
pub mod pattern;

/// Metrics collection, aggregation, and the provider view consumed by
/// adaptive patterns.
pub mod metrics;

/// Backpressure providers and handlers.
pub mod backpressure;

/// The execution engine: dispatch loop, worker pool, shutdown protocol.
pub mod engine;

/// Metrics exporters: console, CSV, JSON, and HTML reports.
pub mod export;
