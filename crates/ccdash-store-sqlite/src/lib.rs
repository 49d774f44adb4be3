//! SQLite record store for ccdash
//!
//! Implements [`ccdash_core::RecordStore`] over three tables: `call_report`,
//! `chat_report` and `requests` (classification documents).

pub mod import;
pub mod records;
mod schema;
mod sql;
mod store;

pub use import::{ImportStats, RecordKind, import_jsonl};
pub use records::{CallRecord, ChatRecord, Classifier, RequestRecord};
pub use store::{DEFAULT_MAX_CONNECTIONS, SqliteRecordStore, default_report_offset};

use ccdash_core::Error;

/// Map driver errors into the core error type
///
/// A closed pool means the store handle is gone.
pub(crate) fn db_err(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::PoolClosed => Error::Unavailable("SQLite pool is closed".to_string()),
        other => Error::Database(other.to_string()),
    }
}
