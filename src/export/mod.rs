//! Metrics exporters and the export pipeline.
//!
//! Exporters consume [`MetricsSnapshot`]s; they never reach into the
//! collector. The [`ExporterPipeline`] fans a snapshot out to every
//! registered exporter, isolating failures so one broken report sink never
//! silences the others. Cadence is the pipeline builder's choice: with an
//! interval set the engine ticks it periodically, otherwise it runs once at
//! end-of-run.

mod console;
mod context;
mod csv;
mod html;
mod json;

pub use console::ConsoleExporter;
pub use context::{RunContext, SystemInfo};
pub use csv::CsvReportExporter;
pub use html::HtmlReportExporter;
pub use json::JsonReportExporter;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::metrics::MetricsSnapshot;

/// Consumes snapshots and renders them somewhere: a terminal, a file, a
/// wire.
#[async_trait]
pub trait MetricsExporter: Send + Sync {
    /// Exports one snapshot under the given title.
    async fn export(
        &self,
        title: &str,
        snapshot: &MetricsSnapshot,
        context: Option<&RunContext>,
    ) -> Result<()>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Fans snapshots out to a set of exporters.
#[derive(Default)]
pub struct ExporterPipeline {
    exporters: Vec<Arc<dyn MetricsExporter>>,
    interval: Option<Duration>,
}

impl ExporterPipeline {
    /// Creates an empty pipeline that exports only at end-of-run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exporter.
    pub fn with_exporter(mut self, exporter: Arc<dyn MetricsExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    /// Opts into periodic export at the given interval, in addition to the
    /// end-of-run export.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// The configured periodic interval, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// True when no exporters are registered.
    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    /// Exports to every registered exporter. A failing exporter is logged
    /// and skipped; the rest still run.
    pub async fn export_all(
        &self,
        title: &str,
        snapshot: &MetricsSnapshot,
        context: Option<&RunContext>,
    ) {
        for exporter in &self.exporters {
            if let Err(error) = exporter.export(title, snapshot, context).await {
                warn!(exporter = exporter.name(), %error, "exporter failed");
            }
        }
    }
}

/// Renders a percentile key the way reports label it: `quantile * 100` with
/// trailing zeros stripped (0.95 → "95", 0.999 → "99.9").
pub(crate) fn percentile_label(quantile: f64) -> String {
    let scaled = quantile * 100.0;
    // Round away float noise (0.95 * 100 is not exactly 95) before
    // formatting, then let Display drop the trailing zeros.
    let rounded = (scaled * 1e6).round() / 1e6;
    format!("{}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsCollector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingExporter;

    #[async_trait]
    impl MetricsExporter for FailingExporter {
        async fn export(
            &self,
            _title: &str,
            _snapshot: &MetricsSnapshot,
            _context: Option<&RunContext>,
        ) -> Result<()> {
            Err(crate::error::Error::Export("disk full".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[derive(Default)]
    struct CountingExporter {
        exports: AtomicUsize,
    }

    #[async_trait]
    impl MetricsExporter for CountingExporter {
        async fn export(
            &self,
            _title: &str,
            _snapshot: &MetricsSnapshot,
            _context: Option<&RunContext>,
        ) -> Result<()> {
            self.exports.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_failing_exporter_does_not_block_others() {
        let counting = Arc::new(CountingExporter::default());
        let pipeline = ExporterPipeline::new()
            .with_exporter(Arc::new(FailingExporter))
            .with_exporter(Arc::clone(&counting) as Arc<dyn MetricsExporter>);

        let snapshot = MetricsCollector::new().snapshot();
        pipeline.export_all("test", &snapshot, None).await;
        assert_eq!(counting.exports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_percentile_labels() {
        assert_eq!(percentile_label(0.5), "50");
        assert_eq!(percentile_label(0.95), "95");
        assert_eq!(percentile_label(0.99), "99");
        assert_eq!(percentile_label(0.999), "99.9");
        assert_eq!(percentile_label(0.9995), "99.95");
        assert_eq!(percentile_label(1.0), "100");
    }
}
