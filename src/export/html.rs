//! Self-contained HTML report.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

use super::{percentile_label, MetricsExporter, RunContext};
use crate::error::Result;
use crate::metrics::{LatencySummary, MetricsSnapshot};

/// Writes a single-file HTML report: a summary grid, a details table, and a
/// CSS bar chart per latency series. No external assets.
pub struct HtmlReportExporter {
    path: PathBuf,
}

impl HtmlReportExporter {
    /// Creates an exporter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricsExporter for HtmlReportExporter {
    async fn export(
        &self,
        title: &str,
        snapshot: &MetricsSnapshot,
        context: Option<&RunContext>,
    ) -> Result<()> {
        let page = render_html(title, snapshot, context);
        tokio::fs::write(&self.path, page).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "html-report"
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn stat_card(label: &str, value: String) -> String {
    format!(
        "<div class=\"card\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>",
        html_escape(&value),
        html_escape(label)
    )
}

fn latency_chart(title: &str, summary: &LatencySummary) -> String {
    if summary.is_empty() {
        return format!(
            "<section><h2>{}</h2><p class=\"na\">N/A — no samples recorded</p></section>",
            html_escape(title)
        );
    }
    let max_ns = summary
        .percentiles
        .iter()
        .map(|&(_, v)| v)
        .max()
        .unwrap_or(1)
        .max(1);
    let bars: String = summary
        .percentiles
        .iter()
        .map(|&(q, v)| {
            let width = (v as f64 / max_ns as f64 * 100.0).max(1.0);
            format!(
                "<div class=\"bar-row\"><span class=\"bar-label\">P{}</span>\
                 <div class=\"bar\" style=\"width:{:.1}%\"></div>\
                 <span class=\"bar-value\">{:.2} ms</span></div>",
                percentile_label(q),
                width,
                v as f64 / 1e6
            )
        })
        .collect();
    format!(
        "<section><h2>{}</h2><div class=\"chart\">{}</div>\
         <p class=\"stats\">{} samples · mean {:.2} ms · min {:.2} ms · max {:.2} ms</p></section>",
        html_escape(title),
        bars,
        summary.count,
        summary.mean_ms(),
        summary.min_ns as f64 / 1e6,
        summary.max_ns as f64 / 1e6
    )
}

pub(crate) fn render_html(
    title: &str,
    snapshot: &MetricsSnapshot,
    context: Option<&RunContext>,
) -> String {
    let mut cards = String::new();
    cards.push_str(&stat_card("Total", snapshot.total_executions.to_string()));
    cards.push_str(&stat_card("Success", snapshot.success_count.to_string()));
    cards.push_str(&stat_card("Failures", snapshot.failure_count.to_string()));
    cards.push_str(&stat_card(
        "Success Rate",
        format!("{:.2}%", snapshot.success_rate()),
    ));
    cards.push_str(&stat_card(
        "Throughput",
        format!("{:.1}/s", snapshot.response_tps),
    ));
    cards.push_str(&stat_card("Queue", snapshot.queue_size.to_string()));

    let mut details = String::new();
    let mut detail = |metric: &str, value: String| {
        details.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            html_escape(metric),
            html_escape(&value)
        ));
    };
    detail("Elapsed", format!("{:.1} s", snapshot.elapsed_ms as f64 / 1_000.0));
    detail("Dropped", snapshot.dropped_count.to_string());
    detail("Rejected", snapshot.rejected_count.to_string());
    detail("Success TPS", format!("{:.2}", snapshot.success_tps));
    detail("Failure TPS", format!("{:.2}", snapshot.failure_tps));
    if let Some(ctx) = context {
        detail("Run Id", ctx.run_id.clone());
        detail("Task", ctx.task_name.clone());
        detail("Load Pattern", ctx.pattern_name.clone());
        detail("Host", ctx.system_info.hostname.clone());
        detail("Started", ctx.start_time.to_rfc3339());
    }
    if let Some(adaptive) = &snapshot.adaptive {
        detail("Adaptive Phase", adaptive.phase.to_string());
        detail("Adaptive TPS", format!("{:.1}", adaptive.current_tps));
        if let Some(stable) = adaptive.stable_tps {
            detail("Stable TPS", format!("{:.1}", stable));
        }
        detail(
            "Phase Transitions",
            adaptive.phase_transitions.to_string(),
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
<title>{title}</title>\
<style>\
body{{font-family:system-ui,sans-serif;margin:2rem;color:#1a1a1a}}\
h1{{margin-bottom:0.25rem}}\
.meta{{color:#666;margin-bottom:1.5rem}}\
.grid{{display:flex;flex-wrap:wrap;gap:1rem;margin-bottom:2rem}}\
.card{{border:1px solid #ddd;border-radius:8px;padding:1rem 1.5rem;min-width:7rem;text-align:center}}\
.card .value{{font-size:1.6rem;font-weight:600}}\
.card .label{{color:#666;font-size:0.85rem}}\
table{{border-collapse:collapse;margin-bottom:2rem}}\
td{{border:1px solid #ddd;padding:0.4rem 0.9rem}}\
.chart{{max-width:40rem}}\
.bar-row{{display:flex;align-items:center;gap:0.5rem;margin:0.25rem 0}}\
.bar-label{{width:4rem;text-align:right;color:#444}}\
.bar{{background:#4178be;height:1rem;border-radius:3px}}\
.bar-value{{color:#444}}\
.na,.stats{{color:#666}}\
</style></head><body>\
<h1>{title}</h1><p class=\"meta\">Generated {generated}</p>\
<div class=\"grid\">{cards}</div>\
<table><tbody>{details}</tbody></table>\
{success_chart}{failure_chart}{queue_chart}\
</body></html>\n",
        title = html_escape(title),
        generated = Utc::now().to_rfc3339(),
        cards = cards,
        details = details,
        success_chart = latency_chart("Success Latency", &snapshot.success_latency),
        failure_chart = latency_chart("Failure Latency", &snapshot.failure_latency),
        queue_chart = latency_chart("Queue Wait", &snapshot.queue_wait),
    )
}
