//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for ccdash:
//! - Report counts and failures by report kind and error type
//! - Report and store-step latency histograms
//! - Undecodable rows skipped per source table

use ccdash_core::ReportObserver;
use ccdash_core::report::ReportKind;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector for ccdash
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Reports attempted, by kind
    pub reports_total: CounterVec,
    /// Reports that aborted, by kind and error type
    pub report_failures: CounterVec,
    /// End-to-end report duration
    pub report_duration_seconds: HistogramVec,
    /// Duration of individual store steps
    pub store_step_duration_seconds: HistogramVec,
    /// Records dropped because they could not be decoded
    pub rows_skipped_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reports_total = CounterVec::new(
            Opts::new("ccdash_reports_total", "Total number of reports requested"),
            &["report"],
        )?;

        let report_failures = CounterVec::new(
            Opts::new(
                "ccdash_report_failures_total",
                "Total number of reports that failed",
            ),
            &["report", "error_type"],
        )?;

        let report_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ccdash_report_duration_seconds",
                "Report duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["report"],
        )?;

        let store_step_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ccdash_store_step_duration_seconds",
                "Store step duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["step"],
        )?;

        let rows_skipped_total = CounterVec::new(
            Opts::new(
                "ccdash_rows_skipped_total",
                "Undecodable store rows skipped",
            ),
            &["source"],
        )?;

        registry.register(Box::new(reports_total.clone()))?;
        registry.register(Box::new(report_failures.clone()))?;
        registry.register(Box::new(report_duration_seconds.clone()))?;
        registry.register(Box::new(store_step_duration_seconds.clone()))?;
        registry.register(Box::new(rows_skipped_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            reports_total,
            report_failures,
            report_duration_seconds,
            store_step_duration_seconds,
            rows_skipped_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered family in the Prometheus text format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    pub fn record_report_success(&self, report: &str, duration_secs: f64) {
        self.reports_total.with_label_values(&[report]).inc();
        self.report_duration_seconds
            .with_label_values(&[report])
            .observe(duration_secs);
    }

    pub fn record_report_failure(&self, report: &str, error_type: &str, duration_secs: f64) {
        self.reports_total.with_label_values(&[report]).inc();
        self.report_failures
            .with_label_values(&[report, error_type])
            .inc();
        self.report_duration_seconds
            .with_label_values(&[report])
            .observe(duration_secs);
    }

    pub fn record_store_step(&self, step: &str, duration_secs: f64) {
        self.store_step_duration_seconds
            .with_label_values(&[step])
            .observe(duration_secs);
    }

    pub fn record_rows_skipped(&self, source: &str, count: u64) {
        self.rows_skipped_total
            .with_label_values(&[source])
            .inc_by(count as f64);
    }
}

impl ReportObserver for Metrics {
    fn report_completed(&self, kind: ReportKind, elapsed: Duration) {
        self.record_report_success(kind.as_str(), elapsed.as_secs_f64());
    }

    fn report_failed(&self, kind: ReportKind, error_type: &str, elapsed: Duration) {
        self.record_report_failure(kind.as_str(), error_type, elapsed.as_secs_f64());
    }

    fn step_completed(&self, step: &str, elapsed: Duration) {
        self.record_store_step(step, elapsed.as_secs_f64());
    }

    fn rows_skipped(&self, source: &str, count: u64) {
        self.record_rows_skipped(source, count);
    }
}
