//! ccdash Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout ccdash:
//! - Queue selector normalization and classification path parsing
//! - Typed KPI queries and classification pipeline stages
//! - Report row types
//! - The record store trait and core error types

pub mod classification;
pub mod error;
pub mod kpi;
pub mod observer;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use observer::{NoopObserver, ReportObserver};
pub use queue::{QueueDomain, QueueFilter, QueueNormalizer, QueueTable};
pub use store::RecordStore;
pub use types::{Channel, DateRange, EventType, Granularity};
