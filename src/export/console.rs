//! Console summary exporter.

use async_trait::async_trait;

use super::{percentile_label, MetricsExporter, RunContext};
use crate::error::Result;
use crate::metrics::{LatencySummary, MetricsSnapshot};

/// Prints an aligned text summary to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleExporter;

impl ConsoleExporter {
    /// Creates a console exporter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsExporter for ConsoleExporter {
    async fn export(
        &self,
        title: &str,
        snapshot: &MetricsSnapshot,
        context: Option<&RunContext>,
    ) -> Result<()> {
        println!("{}", render_text(title, snapshot, context));
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

fn latency_line(summary: &LatencySummary) -> String {
    if summary.is_empty() {
        return "N/A".to_string();
    }
    let percentiles: Vec<String> = summary
        .percentiles
        .iter()
        .map(|&(q, ns)| format!("p{} {:.2}ms", percentile_label(q), ns as f64 / 1e6))
        .collect();
    format!("{} (mean {:.2}ms)", percentiles.join(", "), summary.mean_ms())
}

pub(crate) fn render_text(
    title: &str,
    snapshot: &MetricsSnapshot,
    context: Option<&RunContext>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", title));
    out.push_str(&format!("{}\n", "=".repeat(title.len().max(8))));
    if let Some(ctx) = context {
        out.push_str(&format!(
            "Run {} | task {} | pattern {}\n",
            ctx.run_id, ctx.task_name, ctx.pattern_name
        ));
    }
    out.push_str(&format!(
        "Elapsed: {:.1}s\n\
         Executions: {} total, {} ok, {} failed ({} dropped, {} rejected)\n\
         Rates: {:.2} success/s, {:.2} failure/s, {:.2} responses/s\n\
         Queue: {} pending, wait {}\n\
         Success latency: {}\n\
         Failure latency: {}\n",
        snapshot.elapsed_ms as f64 / 1_000.0,
        snapshot.total_executions,
        snapshot.success_count,
        snapshot.failure_count,
        snapshot.dropped_count,
        snapshot.rejected_count,
        snapshot.success_tps,
        snapshot.failure_tps,
        snapshot.response_tps,
        snapshot.queue_size,
        latency_line(&snapshot.queue_wait),
        latency_line(&snapshot.success_latency),
        latency_line(&snapshot.failure_latency),
    ));
    if let Some(adaptive) = &snapshot.adaptive {
        out.push_str(&format!(
            "Adaptive: phase {}, {:.1} tps",
            adaptive.phase, adaptive.current_tps
        ));
        if let Some(stable) = adaptive.stable_tps {
            out.push_str(&format!(", stable at {:.1}", stable));
        }
        out.push_str(&format!(
            " ({} transitions)\n",
            adaptive.phase_transitions
        ));
    }
    out
}
