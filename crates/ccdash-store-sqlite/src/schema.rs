//! Table layout for call, chat and classification records
//!
//! Call and chat timestamps are local wall-clock `YYYY-MM-DD HH:MM:SS` text.
//! Classification documents carry a UTC `created_date` and their classifier
//! array as JSON text.

use ccdash_core::Result;
use sqlx::SqlitePool;

use crate::db_err;

pub(crate) const SCHEMA_VERSION: i64 = 1;

pub(crate) async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await
        .map_err(db_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_report (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            queue_name TEXT NOT NULL,
            type TEXT NOT NULL,
            enter_queue_date TEXT NOT NULL,
            answer_date TEXT,
            call_duration REAL,
            queue_wait_time REAL NOT NULL DEFAULT 0,
            user_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_call_enter ON call_report(enter_queue_date, queue_name)",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_call_answer ON call_report(answer_date)")
        .execute(pool)
        .await
        .map_err(db_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_report (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL,
            created_date TEXT NOT NULL,
            assign_date TEXT,
            chat_frt REAL,
            resolution_time_total REAL,
            agent_frt REAL,
            user_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_created ON chat_report(created_date)")
        .execute(pool)
        .await
        .map_err(db_err)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_assign ON chat_report(assign_date)")
        .execute(pool)
        .await
        .map_err(db_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_date TEXT NOT NULL,
            queue_name TEXT NOT NULL,
            type TEXT NOT NULL,
            classifiers TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_requests_created ON requests(created_date, queue_name)",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    Ok(())
}
