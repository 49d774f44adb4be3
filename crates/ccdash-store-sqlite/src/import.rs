//! Import JSONL record exports into the SQLite store

use ccdash_core::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::records::{CallRecord, ChatRecord, RequestRecord};
use crate::store::SqliteRecordStore;

/// Records per insert transaction
const BATCH_SIZE: usize = 500;

/// Which table a JSONL file feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Calls,
    Chats,
    Requests,
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "calls" | "call" => Ok(RecordKind::Calls),
            "chats" | "chat" => Ok(RecordKind::Chats),
            "requests" | "request" | "classifications" => Ok(RecordKind::Requests),
            other => Err(Error::InvalidRequest(format!(
                "unknown record kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Calls => write!(f, "calls"),
            RecordKind::Chats => write!(f, "chats"),
            RecordKind::Requests => write!(f, "requests"),
        }
    }
}

/// Outcome of one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub imported: u64,
    pub skipped: u64,
}

/// Import one JSONL file, one record per line
///
/// Blank lines are ignored. Lines that do not decode are skipped and counted
/// unless `strict` is set.
///
/// # Errors
/// - `Error::Io` if the file cannot be read
/// - `Error::InvalidRequest` for the first bad line in strict mode
/// - `Error::Database` if an insert fails
pub async fn import_jsonl(
    store: &SqliteRecordStore,
    path: &Path,
    kind: RecordKind,
    strict: bool,
) -> Result<ImportStats> {
    let stats = match kind {
        RecordKind::Calls => {
            import_batches::<CallRecord, _, _>(path, strict, |batch| async move {
                store.insert_calls(&batch).await
            })
            .await?
        }
        RecordKind::Chats => {
            import_batches::<ChatRecord, _, _>(path, strict, |batch| async move {
                store.insert_chats(&batch).await
            })
            .await?
        }
        RecordKind::Requests => {
            import_batches::<RequestRecord, _, _>(path, strict, |batch| async move {
                store.insert_requests(&batch).await
            })
            .await?
        }
    };

    info!(
        kind = %kind,
        path = %path.display(),
        imported = stats.imported,
        skipped = stats.skipped,
        "Import finished"
    );
    Ok(stats)
}

async fn import_batches<T, F, Fut>(path: &Path, strict: bool, insert: F) -> Result<ImportStats>
where
    T: DeserializeOwned,
    F: Fn(Vec<T>) -> Fut,
    Fut: std::future::Future<Output = Result<u64>>,
{
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut stats = ImportStats::default();
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => batch.push(record),
            Err(e) if strict => {
                return Err(Error::InvalidRequest(format!(
                    "{}:{}: {}",
                    path.display(),
                    line_no,
                    e
                )));
            }
            Err(e) => {
                warn!(path = %path.display(), line = line_no, error = %e, "Skipping undecodable line");
                stats.skipped += 1;
            }
        }

        if batch.len() >= BATCH_SIZE {
            stats.imported += insert(std::mem::take(&mut batch)).await?;
        }
    }

    if !batch.is_empty() {
        stats.imported += insert(batch).await?;
    }
    Ok(stats)
}
