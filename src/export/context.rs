//! Run metadata attached to exported reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Host and process facts captured once at run start.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// Operating system name.
    pub os_name: String,
    /// CPU architecture.
    pub os_arch: String,
    /// Hostname, or "unknown" when it cannot be resolved.
    pub hostname: String,
    /// Logical CPU count.
    pub available_processors: usize,
}

impl SystemInfo {
    /// Captures facts about the current host.
    pub fn capture() -> Self {
        Self {
            os_name: std::env::consts::OS.to_string(),
            os_arch: std::env::consts::ARCH.to_string(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            available_processors: num_cpus::get(),
        }
    }
}

/// Identifies one load run: id, what ran, when, and where.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    /// Unique run id.
    pub run_id: String,
    /// Name of the task under load.
    pub task_name: String,
    /// Name of the driving load pattern.
    pub pattern_name: String,
    /// Wall-clock start time.
    pub start_time: DateTime<Utc>,
    /// Host facts.
    pub system_info: SystemInfo,
}

impl RunContext {
    /// Creates a context for a run starting now.
    pub fn new(task_name: impl Into<String>, pattern_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            task_name: task_name.into(),
            pattern_name: pattern_name.into(),
            start_time: Utc::now(),
            system_info: SystemInfo::capture(),
        }
    }
}
