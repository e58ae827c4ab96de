//! Error types for VajraPulse.
//!
//! This module defines the error types used throughout VajraPulse. Errors of
//! this kind are *framework* errors: they abort a run before or during setup.
//! Failures inside a task body are data, not errors — they travel as
//! [`TaskResult::Failure`](crate::task::TaskResult) and end up in the metrics,
//! never in a `Result::Err` from the engine.

use thiserror::Error;

/// Result type alias for VajraPulse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for VajraPulse.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A configuration value failed validation at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A load pattern was constructed with invalid parameters.
    #[error("Invalid load pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern type name
        pattern: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// The engine builder was missing a required component.
    #[error("Engine builder incomplete: {0}")]
    BuilderIncomplete(&'static str),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// `Task::setup` failed; the run was aborted before any dispatch.
    #[error("Task setup failed: {0}")]
    Setup(String),

    /// `run()` was invoked on an engine that already ran.
    #[error("Engine has already been started")]
    AlreadyStarted,

    // ========================================================================
    // Export Errors
    // ========================================================================
    /// A report could not be written.
    #[error("Export failed: {0}")]
    Export(String),

    /// Underlying I/O failure while writing a report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an [`Error::InvalidConfiguration`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }

    /// Shorthand for an [`Error::InvalidPattern`].
    pub fn pattern(pattern: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern,
            message: message.into(),
        }
    }
}
