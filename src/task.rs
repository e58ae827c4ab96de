//! The task contract: the unit of work a load test repeats.
//!
//! A [`Task`] is what the user brings to the framework — an HTTP call, a
//! database query, a message publish. The engine calls `setup` once, drives
//! `execute` concurrently at the pattern-prescribed rate, and calls `cleanup`
//! exactly once on the way out, whatever happened in between.
//!
//! # Example
//!
//! ```rust,ignore
//! use vajrapulse::prelude::*;
//!
//! struct PingTask;
//!
//! #[async_trait]
//! impl Task for PingTask {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     async fn execute(&self, _iteration: u64) -> TaskResult {
//!         match ping("10.0.0.1").await {
//!             Ok(_) => TaskResult::success(),
//!             Err(e) => TaskResult::failure(TaskError::execution(e.to_string())),
//!         }
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;

/// A user-provided unit of work to repeat under load.
///
/// Many `execute` calls may run concurrently on distinct workers; the engine
/// guarantees at most one concurrent `setup`/`cleanup` per task instance.
#[async_trait]
pub trait Task: Send + Sync {
    /// Returns a short name identifying this task in reports and logs.
    fn name(&self) -> &str {
        "task"
    }

    /// Called once before the first submission.
    ///
    /// A failure here aborts the run before any work is dispatched.
    async fn setup(&self) -> std::result::Result<(), TaskError> {
        Ok(())
    }

    /// Executes one iteration of the workload.
    ///
    /// The returned [`TaskResult`] is immutable once produced; the engine
    /// records it against the submission that produced it.
    async fn execute(&self, iteration: u64) -> TaskResult;

    /// Called exactly once after the last worker has finished or been
    /// cancelled. A failure here is logged and does not overwrite the run
    /// result.
    async fn cleanup(&self) -> std::result::Result<(), TaskError> {
        Ok(())
    }
}

/// Outcome of a single task execution.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// The iteration completed successfully.
    Success {
        /// Optional payload for exporters or assertions.
        data: Option<serde_json::Value>,
    },
    /// The iteration failed.
    Failure {
        /// What went wrong.
        error: TaskError,
    },
}

impl TaskResult {
    /// Creates a successful result with no payload.
    pub fn success() -> Self {
        TaskResult::Success { data: None }
    }

    /// Creates a successful result carrying a payload.
    pub fn success_with_data(data: serde_json::Value) -> Self {
        TaskResult::Success { data: Some(data) }
    }

    /// Creates a failed result.
    pub fn failure(error: TaskError) -> Self {
        TaskResult::Failure { error }
    }

    /// Returns true if this result is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }

    /// Returns the error if this result is a failure.
    pub fn error(&self) -> Option<&TaskError> {
        match self {
            TaskResult::Success { .. } => None,
            TaskResult::Failure { error } => Some(error),
        }
    }
}

/// A task-level failure, categorised by origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    /// Where the failure came from.
    pub kind: TaskErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// Origin of a task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskErrorKind {
    /// The task body itself reported a failure.
    Execution,
    /// The submission was rejected by the backpressure handler; a synthetic
    /// failure is recorded in its place.
    BackpressureRejection,
    /// The worker was cancelled during forced shutdown.
    ShutdownCancellation,
    /// The task body panicked; the panic was caught at the worker boundary.
    Panic,
}

impl TaskError {
    /// A failure reported by the task body.
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Execution,
            message: message.into(),
        }
    }

    /// The synthetic failure recorded for a rejected submission.
    pub fn backpressure_rejection() -> Self {
        Self {
            kind: TaskErrorKind::BackpressureRejection,
            message: "backpressure rejection".to_string(),
        }
    }

    /// The failure recorded for work cancelled during forced shutdown.
    pub fn shutdown_cancellation() -> Self {
        Self {
            kind: TaskErrorKind::ShutdownCancellation,
            message: "shutdown cancellation".to_string(),
        }
    }

    /// The failure recorded when a task body panics.
    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Panic,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskErrorKind::Execution => write!(f, "execution"),
            TaskErrorKind::BackpressureRejection => write!(f, "backpressure rejection"),
            TaskErrorKind::ShutdownCancellation => write!(f, "shutdown cancellation"),
            TaskErrorKind::Panic => write!(f, "panic"),
        }
    }
}

impl std::error::Error for TaskError {}
