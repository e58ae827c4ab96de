//! Built-in backpressure handlers.

use super::{BackpressureContext, BackpressureDecision, BackpressureHandler};
use crate::error::{Error, Result};

/// Always drops: pressured submissions are skipped silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropHandler;

impl BackpressureHandler for DropHandler {
    fn handle(&self, _level: f64, _context: &BackpressureContext) -> BackpressureDecision {
        BackpressureDecision::Dropped
    }

    fn name(&self) -> &str {
        "drop"
    }
}

/// Always queues: no filtering beyond the engine's threshold gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueHandler;

impl BackpressureHandler for QueueHandler {
    fn handle(&self, _level: f64, _context: &BackpressureContext) -> BackpressureDecision {
        BackpressureDecision::Queued
    }

    fn name(&self) -> &str {
        "queue"
    }
}

/// Always rejects: pressured submissions become synthetic failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectHandler;

impl BackpressureHandler for RejectHandler {
    fn handle(&self, _level: f64, _context: &BackpressureContext) -> BackpressureDecision {
        BackpressureDecision::Rejected
    }

    fn name(&self) -> &str {
        "reject"
    }
}

/// Graduated response across three pressure bands.
///
/// With `0 <= queue_below < reject_below < drop_below <= 1`:
/// a submission is Accepted while `level < queue_below`, Queued while
/// `level < reject_below`, Rejected while `level < drop_below`, and Dropped
/// at or above `drop_below`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdHandler {
    queue_below: f64,
    reject_below: f64,
    drop_below: f64,
}

impl ThresholdHandler {
    /// Creates a threshold handler; bands must be strictly ordered within
    /// `[0, 1]`.
    pub fn new(queue_below: f64, reject_below: f64, drop_below: f64) -> Result<Self> {
        let ordered = 0.0 <= queue_below
            && queue_below < reject_below
            && reject_below < drop_below
            && drop_below <= 1.0;
        if !ordered {
            return Err(Error::config(format!(
                "threshold bands must satisfy 0 <= q < r < d <= 1, got q={}, r={}, d={}",
                queue_below, reject_below, drop_below
            )));
        }
        Ok(Self {
            queue_below,
            reject_below,
            drop_below,
        })
    }
}

impl BackpressureHandler for ThresholdHandler {
    fn handle(&self, level: f64, _context: &BackpressureContext) -> BackpressureDecision {
        if level < self.queue_below {
            BackpressureDecision::Accepted
        } else if level < self.reject_below {
            BackpressureDecision::Queued
        } else if level < self.drop_below {
            BackpressureDecision::Rejected
        } else {
            BackpressureDecision::Dropped
        }
    }

    fn name(&self) -> &str {
        "threshold"
    }
}
