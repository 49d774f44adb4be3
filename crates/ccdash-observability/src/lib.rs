//! ccdash Observability
//!
//! This crate provides:
//! - Report and store-step metrics (Prometheus)
//! - Tracing subscriber setup for the binary

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::Metrics;
