//! Two-column CSV report.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

use super::{percentile_label, MetricsExporter, RunContext};
use crate::error::Result;
use crate::metrics::{LatencySummary, MetricsSnapshot};

/// Writes a `Metric,Value` CSV report to a file. Sections are separated by
/// blank rows; latencies are reported in milliseconds.
pub struct CsvReportExporter {
    path: PathBuf,
}

impl CsvReportExporter {
    /// Creates an exporter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricsExporter for CsvReportExporter {
    async fn export(
        &self,
        title: &str,
        snapshot: &MetricsSnapshot,
        context: Option<&RunContext>,
    ) -> Result<()> {
        let report = render_csv(title, snapshot, context);
        tokio::fs::write(&self.path, report).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "csv-report"
    }
}

/// Quotes a CSV field when it contains a comma, quote, or newline,
/// doubling embedded quotes.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(out: &mut String, metric: &str, value: &str) {
    out.push_str(&escape(metric));
    out.push(',');
    out.push_str(&escape(value));
    out.push('\n');
}

fn latency_rows(out: &mut String, label: &str, summary: &LatencySummary) {
    if summary.is_empty() {
        row(out, &format!("{} Samples", label), "0");
        row(out, &format!("{} Latency", label), "N/A");
        return;
    }
    row(out, &format!("{} Samples", label), &summary.count.to_string());
    for &(quantile, value_ns) in &summary.percentiles {
        row(
            out,
            &format!("{} P{}", label, percentile_label(quantile)),
            &format!("{:.2} ms", value_ns as f64 / 1e6),
        );
    }
    row(out, &format!("{} Mean", label), &format!("{:.2} ms", summary.mean_ms()));
    row(
        out,
        &format!("{} Std Dev", label),
        &format!("{:.2} ms", summary.stddev_ns / 1e6),
    );
    row(
        out,
        &format!("{} Min", label),
        &format!("{:.2} ms", summary.min_ns as f64 / 1e6),
    );
    row(
        out,
        &format!("{} Max", label),
        &format!("{:.2} ms", summary.max_ns as f64 / 1e6),
    );
}

/// Renders the report. Pure, so format tests exercise it directly.
pub(crate) fn render_csv(
    title: &str,
    snapshot: &MetricsSnapshot,
    context: Option<&RunContext>,
) -> String {
    let mut out = String::new();
    row(&mut out, "Metric", "Value");
    row(&mut out, "Report", title);
    row(&mut out, "Generated", &Utc::now().to_rfc3339());
    if let Some(ctx) = context {
        row(&mut out, "Run Id", &ctx.run_id);
        row(&mut out, "Task", &ctx.task_name);
        row(&mut out, "Load Pattern", &ctx.pattern_name);
        row(&mut out, "Host", &ctx.system_info.hostname);
    }
    row(
        &mut out,
        "Elapsed Seconds",
        &format!("{:.2}", snapshot.elapsed_ms as f64 / 1_000.0),
    );
    out.push('\n');

    row(&mut out, "Total Executions", &snapshot.total_executions.to_string());
    row(&mut out, "Success Count", &snapshot.success_count.to_string());
    row(&mut out, "Failure Count", &snapshot.failure_count.to_string());
    row(&mut out, "Dropped Count", &snapshot.dropped_count.to_string());
    row(&mut out, "Rejected Count", &snapshot.rejected_count.to_string());
    row(&mut out, "Success Rate", &format!("{:.2}", snapshot.success_rate()));
    row(&mut out, "Failure Rate", &format!("{:.2}", snapshot.failure_rate()));
    row(&mut out, "Success TPS", &format!("{:.2}", snapshot.success_tps));
    row(&mut out, "Failure TPS", &format!("{:.2}", snapshot.failure_tps));
    row(&mut out, "Response TPS", &format!("{:.2}", snapshot.response_tps));
    out.push('\n');

    row(&mut out, "Queue Size", &snapshot.queue_size.to_string());
    latency_rows(&mut out, "Queue Wait", &snapshot.queue_wait);
    out.push('\n');

    latency_rows(&mut out, "Success", &snapshot.success_latency);
    out.push('\n');

    latency_rows(&mut out, "Failure", &snapshot.failure_latency);

    if let Some(adaptive) = &snapshot.adaptive {
        out.push('\n');
        row(&mut out, "Adaptive Phase", &adaptive.phase.to_string());
        row(
            &mut out,
            "Adaptive Current TPS",
            &format!("{:.2}", adaptive.current_tps),
        );
        if let Some(stable) = adaptive.stable_tps {
            row(&mut out, "Adaptive Stable TPS", &format!("{:.2}", stable));
        }
        row(
            &mut out,
            "Adaptive Phase Transitions",
            &adaptive.phase_transitions.to_string(),
        );
    }

    out
}
