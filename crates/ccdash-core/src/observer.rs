//! Hooks for observing report execution
//!
//! The engine reports timings and failures through this trait so metrics
//! backends stay out of the core crates.

use std::time::Duration;

use crate::report::ReportKind;

pub trait ReportObserver: Send + Sync {
    /// A report finished successfully
    fn report_completed(&self, kind: ReportKind, elapsed: Duration);

    /// A report aborted; `error_type` is `Error::kind()`
    fn report_failed(&self, kind: ReportKind, error_type: &str, elapsed: Duration);

    /// One store step finished (successfully or not)
    fn step_completed(&self, step: &str, elapsed: Duration);

    /// Undecodable records were skipped while reading `source`
    fn rows_skipped(&self, _source: &str, _count: u64) {}
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReportObserver for NoopObserver {
    fn report_completed(&self, _kind: ReportKind, _elapsed: Duration) {}

    fn report_failed(&self, _kind: ReportKind, _error_type: &str, _elapsed: Duration) {}

    fn step_completed(&self, _step: &str, _elapsed: Duration) {}
}
