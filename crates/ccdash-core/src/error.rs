//! Error types for ccdash

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The record store handle has not been established
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A store query failed while computing the named aggregate step
    #[error("Query failed while computing {step}: {message}")]
    Query { step: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Hourly report requested for a metric the engine does not know
    #[error("Unsupported metric: {0}")]
    InvalidMetric(String),

    #[error("Report cancelled while computing {step}")]
    Cancelled { step: String },

    #[error("Timed out after {after:?} while computing {step}")]
    Timeout { step: String, after: Duration },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration not found")]
    ConfigNotFound,

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach the name of the aggregate step that was running when a store call failed.
    ///
    /// Errors that already carry a step, or that describe a missing store handle,
    /// are passed through unchanged.
    pub fn in_step(self, step: &str) -> Self {
        match self {
            Error::Unavailable(_)
            | Error::Query { .. }
            | Error::Cancelled { .. }
            | Error::Timeout { .. }
            | Error::InvalidRequest(_)
            | Error::InvalidMetric(_) => self,
            other => Error::Query {
                step: step.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Short label used for failure metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unavailable(_) => "unavailable",
            Error::Query { .. } => "query",
            Error::InvalidRequest(_) | Error::InvalidMetric(_) => "invalid_request",
            Error::Cancelled { .. } => "cancelled",
            Error::Timeout { .. } => "timeout",
            Error::Config(_) | Error::ConfigNotFound => "config",
            Error::Database(_) => "database",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
