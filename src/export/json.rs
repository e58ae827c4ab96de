//! Nested JSON report.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::{percentile_label, MetricsExporter, RunContext};
use crate::error::Result;
use crate::metrics::{LatencySummary, MetricsSnapshot};

/// Writes a structured JSON report to a file.
pub struct JsonReportExporter {
    path: PathBuf,
}

impl JsonReportExporter {
    /// Creates an exporter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricsExporter for JsonReportExporter {
    async fn export(
        &self,
        title: &str,
        snapshot: &MetricsSnapshot,
        context: Option<&RunContext>,
    ) -> Result<()> {
        let report = render_json(title, snapshot, context);
        let body = serde_json::to_string_pretty(&report)
            .map_err(|e| crate::error::Error::Export(e.to_string()))?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json-report"
    }
}

/// Percentile map in milliseconds, keyed `p50`, `p95`, `p99.9`, …
fn percentiles_ms(summary: &LatencySummary) -> Value {
    let mut map = Map::new();
    for &(quantile, value_ns) in &summary.percentiles {
        map.insert(
            format!("p{}", percentile_label(quantile)),
            json!(value_ns as f64 / 1e6),
        );
    }
    Value::Object(map)
}

fn latency_ms(summary: &LatencySummary) -> Value {
    let mut map = match percentiles_ms(summary) {
        Value::Object(map) => map,
        _ => unreachable!("percentiles_ms always builds an object"),
    };
    map.insert("count".to_string(), json!(summary.count));
    map.insert("meanMs".to_string(), json!(summary.mean_ms()));
    map.insert("stddevMs".to_string(), json!(summary.stddev_ns / 1e6));
    map.insert("minMs".to_string(), json!(summary.min_ns as f64 / 1e6));
    map.insert("maxMs".to_string(), json!(summary.max_ns as f64 / 1e6));
    Value::Object(map)
}

/// Renders the report object. Pure, so format tests exercise it directly.
pub(crate) fn render_json(
    title: &str,
    snapshot: &MetricsSnapshot,
    context: Option<&RunContext>,
) -> Value {
    let mut report = json!({
        "metadata": {
            "title": title,
            "timestamp": Utc::now().to_rfc3339(),
            "elapsedSeconds": snapshot.elapsed_ms as f64 / 1_000.0,
        },
        "summary": {
            "totalExecutions": snapshot.total_executions,
            "successCount": snapshot.success_count,
            "failureCount": snapshot.failure_count,
            "droppedCount": snapshot.dropped_count,
            "rejectedCount": snapshot.rejected_count,
            "successRate": snapshot.success_rate(),
            "failureRate": snapshot.failure_rate(),
            "successTps": snapshot.success_tps,
            "failureTps": snapshot.failure_tps,
            "responseTps": snapshot.response_tps,
        },
        "queue": {
            "size": snapshot.queue_size,
            "waitTimeMs": percentiles_ms(&snapshot.queue_wait),
        },
        "successLatencyMs": latency_ms(&snapshot.success_latency),
        "failureLatencyMs": latency_ms(&snapshot.failure_latency),
    });

    if let Some(ctx) = context {
        report["metadata"]["runId"] = json!(ctx.run_id);
        report["metadata"]["task"] = json!(ctx.task_name);
        report["metadata"]["loadPattern"] = json!(ctx.pattern_name);
        report["metadata"]["startTime"] = json!(ctx.start_time.to_rfc3339());
        report["metadata"]["system"] = serde_json::to_value(&ctx.system_info)
            .unwrap_or(Value::Null);
    }

    if let Some(adaptive) = &snapshot.adaptive {
        report["adaptivePattern"] = json!({
            "phase": adaptive.phase.to_string(),
            "phaseOrdinal": adaptive.phase.ordinal(),
            "currentTps": adaptive.current_tps,
            "stableTps": adaptive.stable_tps,
            "phaseTransitions": adaptive.phase_transitions,
        });
    }

    report
}
