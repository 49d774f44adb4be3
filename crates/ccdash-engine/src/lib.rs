//! ccdash reporting engine
//!
//! KPI and classification aggregators over a [`ccdash_core::RecordStore`],
//! and the [`ReportService`] facade that callers use.

pub mod classification;
pub mod context;
pub mod kpi;
pub mod service;

#[cfg(test)]
mod fake;

pub use classification::{ClassificationAggregator, ClassificationMode, ClassificationRows};
pub use context::RequestContext;
pub use kpi::{HourlyMetric, KpiAggregator, KpiRows};
pub use service::ReportService;
