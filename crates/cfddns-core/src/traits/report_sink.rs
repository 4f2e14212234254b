// # Report Sink Trait
//
// Receives the consolidated report of a cycle and delivers it through a
// configured channel (mail, chat, nothing at all).

use crate::report::CycleReport;
use async_trait::async_trait;

/// Trait for cycle report delivery
///
/// `deliver` has no error path. A sink logs its own delivery failures and
/// returns; the reconciliation loop never sees them.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one cycle report
    async fn deliver(&self, report: &CycleReport);

    /// Short name for logging
    fn sink_name(&self) -> &'static str;
}

/// A sink that drops every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl ReportSink for NoopSink {
    async fn deliver(&self, report: &CycleReport) {
        tracing::debug!("No report sink configured, dropping report: {}", report.subject());
    }

    fn sink_name(&self) -> &'static str {
        "noop"
    }
}
