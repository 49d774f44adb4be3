//! SqliteRecordStore - RecordStore trait implementation for SQLite

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use ccdash_core::kpi::{AgentQuery, AgentSighting, BucketKey, BucketRow, Bucketing, KpiQuery};
use ccdash_core::pipeline::{ClassificationEntry, ClassificationFilter};
use ccdash_core::report::{AmlDailyStats, QueueCount};
use ccdash_core::types::DATE_FORMAT;
use ccdash_core::{DateRange, EventType, NoopObserver, RecordStore, ReportObserver, Result};

use crate::db_err;
use crate::records::{CallRecord, ChatRecord, RequestRecord};
use crate::schema::initialize_schema;
use crate::sql::{TIMESTAMP_FORMAT, agent_statement, aggregate_statement};

/// Default number of pooled connections
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Reporting offset used when none is configured (+04:00)
pub fn default_report_offset() -> FixedOffset {
    FixedOffset::east_opt(4 * 3600).unwrap_or_else(|| Utc.fix())
}

/// SQLite record store
///
/// Call and chat KPI aggregations run in SQL. Classification documents are
/// filtered in SQL by queue, type and UTC window, then unwound and re-dated
/// into the reporting offset in Rust.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    report_offset: FixedOffset,
    observer: Arc<dyn ReportObserver>,
}

impl SqliteRecordStore {
    /// Open (creating if missing) a database file
    ///
    /// # Errors
    /// - `Error::Io` if the parent directory cannot be created
    /// - `Error::Database` if the connection or schema bootstrap fails
    pub async fn open(db_path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, bootstrapping the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        initialize_schema(&pool).await?;
        Ok(Self {
            pool,
            report_offset: default_report_offset(),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Offset used to derive classification report dates
    pub fn with_report_offset(mut self, offset: FixedOffset) -> Self {
        self.report_offset = offset;
        self
    }

    /// Receive skipped-row counts
    pub fn with_observer(mut self, observer: Arc<dyn ReportObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert call rows in one transaction
    pub async fn insert_calls(&self, records: &[CallRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO call_report
                    (queue_name, type, enter_queue_date, answer_date, call_duration,
                     queue_wait_time, user_id)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.queue_name)
            .bind(&record.event_type)
            .bind(wall_clock(&record.enter_queue_date))
            .bind(record.answer_date.as_ref().map(wall_clock))
            .bind(record.call_duration)
            .bind(record.queue_wait_time)
            .bind(&record.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(records.len() as u64)
    }

    /// Insert chat rows in one transaction
    pub async fn insert_chats(&self, records: &[ChatRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO chat_report
                    (type, created_date, assign_date, chat_frt, resolution_time_total,
                     agent_frt, user_id)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.event_type)
            .bind(wall_clock(&record.created_date))
            .bind(record.assign_date.as_ref().map(wall_clock))
            .bind(record.chat_frt)
            .bind(record.resolution_time_total)
            .bind(record.agent_frt)
            .bind(&record.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(records.len() as u64)
    }

    /// Insert request documents in one transaction
    pub async fn insert_requests(&self, records: &[RequestRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for record in records {
            let classifiers = serde_json::to_string(&record.classifiers)?;
            sqlx::query(
                r#"
                INSERT INTO requests (created_date, queue_name, type, classifiers)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(record.created_date.format(TIMESTAMP_FORMAT).to_string())
            .bind(&record.queue_name)
            .bind(&record.event_type)
            .bind(classifiers)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(records.len() as u64)
    }

    fn skipped(&self, source: &str, count: u64) {
        if count > 0 {
            warn!(source, count, "Skipped undecodable rows");
            self.observer.rows_skipped(source, count);
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn aggregate(&self, query: &KpiQuery) -> Result<Vec<BucketRow>> {
        let statement = aggregate_statement(query)?;
        debug!(sql = %statement.sql, "Running aggregate");

        let rows = statement
            .query()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut buckets = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            match decode_key(row, query.bucketing) {
                Some(key) => {
                    let value = row.try_get::<Option<f64>, _>("value").ok().flatten();
                    buckets.push(BucketRow::new(key, value));
                }
                None => skipped += 1,
            }
        }
        self.skipped(crate::sql::table(query.source()), skipped);
        Ok(buckets)
    }

    async fn agent_sightings(&self, query: &AgentQuery) -> Result<Vec<AgentSighting>> {
        let statement = agent_statement(query);
        debug!(sql = %statement.sql, "Running agent sightings");

        let rows = statement
            .query()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut sightings = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            let agent_id = row.try_get::<Option<String>, _>("agent_id").ok().flatten();
            match (decode_key(row, query.bucketing), agent_id) {
                (Some(key), Some(agent_id)) => sightings.push(AgentSighting { key, agent_id }),
                _ => skipped += 1,
            }
        }
        self.skipped(crate::sql::table(query.source()), skipped);
        Ok(sightings)
    }

    async fn classifications(
        &self,
        filter: &ClassificationFilter,
    ) -> Result<Vec<ClassificationEntry>> {
        if filter.queues.is_empty() {
            return Ok(Vec::new());
        }

        let (start, end) = filter.range.utc_window(self.report_offset);
        let placeholders = vec!["?"; filter.queues.queues().len()].join(", ");
        let sql = format!(
            r#"
            SELECT created_date, queue_name, type, classifiers
            FROM requests
            WHERE type = ?
              AND queue_name IN ({})
              AND created_date BETWEEN ? AND ?
            ORDER BY created_date
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(filter.event_type.as_str());
        for queue in filter.queues.queues() {
            query = query.bind(queue.as_str());
        }
        let rows = query
            .bind(start.format(TIMESTAMP_FORMAT).to_string())
            .bind(end.format(TIMESTAMP_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut entries = Vec::new();
        let mut skipped = 0;
        for row in &rows {
            match self.unwind(row) {
                Some((unwound, bad_elements)) => {
                    skipped += bad_elements;
                    entries.extend(unwound.into_iter().filter(|e| filter.matches(e)));
                }
                None => skipped += 1,
            }
        }
        self.skipped("requests", skipped);
        debug!(documents = rows.len(), entries = entries.len(), "Unwound classifications");
        Ok(entries)
    }

    async fn queue_counts(&self, range: &DateRange) -> Result<Vec<QueueCount>> {
        let rows = sqlx::query(
            r#"
            SELECT queue_name, COUNT(*) AS count
            FROM call_report
            WHERE enter_queue_date BETWEEN ? AND ?
            GROUP BY queue_name
            ORDER BY count DESC, queue_name
            "#,
        )
        .bind(range.lower_bound().format(TIMESTAMP_FORMAT).to_string())
        .bind(range.upper_bound().format(TIMESTAMP_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .iter()
            .map(|row| QueueCount {
                queue_name: row.try_get("queue_name").unwrap_or_default(),
                count: row.try_get::<i64, _>("count").unwrap_or(0).max(0) as u64,
            })
            .collect())
    }

    async fn queue_daily_breakdown(
        &self,
        range: &DateRange,
        queue: &str,
    ) -> Result<Vec<AmlDailyStats>> {
        let rows = sqlx::query(
            r#"
            SELECT
                DATE(enter_queue_date) AS date,
                COUNT(*) AS total_calls,
                SUM(CASE WHEN type = 'in' THEN 1 ELSE 0 END) AS incoming_calls,
                SUM(CASE WHEN type = 'abandon' THEN 1 ELSE 0 END) AS abandoned_calls
            FROM call_report
            WHERE queue_name = ?
              AND enter_queue_date BETWEEN ? AND ?
            GROUP BY DATE(enter_queue_date)
            ORDER BY date
            "#,
        )
        .bind(queue)
        .bind(range.lower_bound().format(TIMESTAMP_FORMAT).to_string())
        .bind(range.upper_bound().format(TIMESTAMP_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stats = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            let Some(date) = decode_date(row, "date") else {
                skipped += 1;
                continue;
            };
            let count = |column: &str| row.try_get::<i64, _>(column).unwrap_or(0).max(0) as u64;
            stats.push(AmlDailyStats {
                date,
                total_calls: count("total_calls"),
                incoming_calls: count("incoming_calls"),
                abandoned_calls: count("abandoned_calls"),
            });
        }
        self.skipped("call_report", skipped);
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

impl SqliteRecordStore {
    /// Unwind one request document into classification entries
    ///
    /// Returns `None` if the document itself cannot be decoded, otherwise the
    /// entries and the number of classifier elements that had no usable path.
    fn unwind(&self, row: &SqliteRow) -> Option<(Vec<ClassificationEntry>, u64)> {
        let created: String = row.try_get("created_date").ok()?;
        let created = NaiveDateTime::parse_from_str(&created, TIMESTAMP_FORMAT).ok()?;
        let report_date = Utc
            .from_utc_datetime(&created)
            .with_timezone(&self.report_offset)
            .date_naive();
        let queue: String = row.try_get("queue_name").ok()?;
        let event_type: String = row.try_get("type").ok()?;
        let raw: String = row.try_get("classifiers").ok()?;
        let classifiers: Vec<serde_json::Value> = serde_json::from_str(&raw).ok()?;

        let mut bad = 0;
        let mut entries = Vec::with_capacity(classifiers.len());
        for classifier in classifiers {
            match classifier.get("path").and_then(|p| p.as_str()) {
                Some(path) => entries.push(ClassificationEntry {
                    report_date,
                    queue: queue.clone(),
                    event_type: EventType::from(event_type.as_str()),
                    path: path.to_string(),
                }),
                None => bad += 1,
            }
        }
        Some((entries, bad))
    }
}

fn wall_clock(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn decode_date(row: &SqliteRow, column: &str) -> Option<NaiveDate> {
    let raw: String = row.try_get::<Option<String>, _>(column).ok().flatten()?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok()
}

fn decode_key(row: &SqliteRow, bucketing: Bucketing) -> Option<BucketKey> {
    match bucketing {
        Bucketing::Date => Some(BucketKey::Date {
            date: decode_date(row, "bucket_date")?,
        }),
        Bucketing::DayOfMonth => {
            let day = row.try_get::<Option<i64>, _>("bucket_day").ok().flatten()?;
            (1..=31)
                .contains(&day)
                .then_some(BucketKey::DayOfMonth { day: day as u32 })
        }
        Bucketing::HourOfDay { buckets } => {
            let date = decode_date(row, "bucket_date")?;
            let hour = row.try_get::<Option<i64>, _>("bucket_hour").ok().flatten()?;
            (hour >= 0 && (hour as usize) < buckets).then_some(BucketKey::DateHour {
                date,
                hour: hour as u32,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Classifier;
    use ccdash_core::kpi::{DurationField, Measure, TimeColumn};
    use ccdash_core::report::ReportKind;
    use ccdash_core::{Error, QueueFilter};
    use std::time::Duration;
    use tempfile::TempDir;

    fn ts(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).unwrap()
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, DATE_FORMAT).unwrap()
    }

    fn call(queue: &str, kind: &str, enter: &str, wait: f64) -> CallRecord {
        CallRecord {
            queue_name: queue.to_string(),
            event_type: kind.to_string(),
            enter_queue_date: ts(enter),
            answer_date: None,
            call_duration: None,
            queue_wait_time: wait,
            user_id: None,
        }
    }

    async fn open(dir: &TempDir) -> SqliteRecordStore {
        SqliteRecordStore::open(&dir.path().join("nested/ccdash.db"), 2)
            .await
            .unwrap()
    }

    fn march_first() -> DateRange {
        DateRange::parse("2024-03-01", "2024-03-01").unwrap()
    }

    #[tokio::test]
    async fn test_count_and_service_level() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let mut calls = Vec::new();
        for i in 0..10 {
            let wait = if i < 8 { 20.0 } else { 45.0 };
            calls.push(call("m10", "in", "2024-03-01 09:00:00", wait));
        }
        calls.push(call("m10", "abandon", "2024-03-01 09:30:00", 60.0));
        calls.push(call("m10-shikayet", "in", "2024-03-01 10:00:00", 1.0));
        calls.push(call("m10", "in", "2024-03-02 00:00:00", 1.0));
        store.insert_calls(&calls).await.unwrap();

        let in_only = KpiQuery::new(TimeColumn::EnterQueue, march_first())
            .with_types([EventType::In])
            .with_queues(QueueFilter::new(["m10"]));

        let counts = store.aggregate(&in_only).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].key, BucketKey::Date { date: date("2024-03-01") });
        assert_eq!(counts[0].value, Some(10.0));

        let sl = store
            .aggregate(&in_only.clone().with_measure(Measure::ServiceLevel { threshold_secs: 20 }))
            .await
            .unwrap();
        assert_eq!(sl[0].value, Some(80.0));
    }

    #[derive(Default)]
    struct SkipLog(std::sync::Mutex<Vec<(String, u64)>>);

    impl ReportObserver for SkipLog {
        fn report_completed(&self, _kind: ReportKind, _elapsed: Duration) {}

        fn report_failed(&self, _kind: ReportKind, _error_type: &str, _elapsed: Duration) {}

        fn step_completed(&self, _step: &str, _elapsed: Duration) {}

        fn rows_skipped(&self, source: &str, count: u64) {
            self.0.lock().unwrap().push((source.to_string(), count));
        }
    }

    #[tokio::test]
    async fn test_undecodable_timestamps_are_skipped() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(SkipLog::default());
        let store = open(&dir).await.with_observer(log.clone());

        store
            .insert_calls(&[
                call("m10", "in", "2024-03-01 09:00:00", 5.0),
                call("m10", "in", "2024-03-01 09:10:00", 50.0),
            ])
            .await
            .unwrap();
        // sorts inside the day window but is not a timestamp
        sqlx::query(
            "INSERT INTO call_report (queue_name, type, enter_queue_date, queue_wait_time) \
             VALUES (?, ?, ?, ?)",
        )
        .bind("m10")
        .bind("in")
        .bind("2024-03-01 0x:00:00")
        .bind(1.0)
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query("INSERT INTO chat_report (type, created_date) VALUES (?, ?), (?, ?)")
            .bind("in")
            .bind("2024-03-01 11:00:00")
            .bind("in")
            .bind("2024-03-01 1?:00:00")
            .execute(store.pool())
            .await
            .unwrap();

        let calls = KpiQuery::new(TimeColumn::EnterQueue, march_first())
            .with_types([EventType::In])
            .with_queues(QueueFilter::new(["m10"]));
        let counts = store.aggregate(&calls).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].key, BucketKey::Date { date: date("2024-03-01") });
        assert_eq!(counts[0].value, Some(2.0));

        let sl = store
            .aggregate(&calls.clone().with_measure(Measure::ServiceLevel { threshold_secs: 20 }))
            .await
            .unwrap();
        assert_eq!(sl.len(), 1);
        assert_eq!(sl[0].value, Some(50.0));

        let hourly = store
            .aggregate(&calls.with_bucketing(Bucketing::hourly()))
            .await
            .unwrap();
        assert_eq!(hourly.len(), 1);
        assert_eq!(
            hourly[0].key,
            BucketKey::DateHour {
                date: date("2024-03-01"),
                hour: 9
            }
        );

        let chats = store
            .aggregate(
                &KpiQuery::new(TimeColumn::Created, march_first()).with_types([EventType::In]),
            )
            .await
            .unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].value, Some(1.0));

        let skipped = log.0.lock().unwrap().clone();
        assert!(skipped.contains(&("call_report".to_string(), 1)));
        assert!(skipped.contains(&("chat_report".to_string(), 1)));
    }

    #[tokio::test]
    async fn test_hourly_average_and_day_of_month() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let mut answered = call("m10", "in", "2024-03-01 08:59:00", 10.0);
        answered.answer_date = Some(ts("2024-03-01 09:00:10"));
        answered.call_duration = Some(100.0);
        let mut second = answered.clone();
        second.call_duration = Some(201.0);
        let mut other_month = call("m10", "in", "2024-04-01 12:00:00", 10.0);
        other_month.answer_date = Some(ts("2024-04-01 12:00:05"));
        store
            .insert_calls(&[answered, second, other_month])
            .await
            .unwrap();

        let aht = KpiQuery::new(TimeColumn::Answer, march_first())
            .with_bucketing(Bucketing::hourly())
            .with_measure(Measure::Average {
                field: DurationField::CallDuration,
            });
        let rows = store.aggregate(&aht).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].key,
            BucketKey::DateHour {
                date: date("2024-03-01"),
                hour: 9
            }
        );
        assert_eq!(rows[0].value, Some(150.5));

        let spanning = DateRange::parse("2024-03-01", "2024-04-30").unwrap();
        let by_day = store
            .aggregate(
                &KpiQuery::new(TimeColumn::EnterQueue, spanning)
                    .with_bucketing(Bucketing::DayOfMonth),
            )
            .await
            .unwrap();
        assert_eq!(by_day.len(), 1);
        assert_eq!(by_day[0].key, BucketKey::DayOfMonth { day: 1 });
        assert_eq!(by_day[0].value, Some(3.0));
    }

    #[tokio::test]
    async fn test_agent_sightings_require_response() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let chat = |agent: &str, frt: f64| ChatRecord {
            event_type: "in".to_string(),
            created_date: ts("2024-03-01 10:00:00"),
            assign_date: Some(ts("2024-03-01 10:01:00")),
            chat_frt: Some(30.0),
            resolution_time_total: Some(600.0),
            agent_frt: Some(frt),
            user_id: Some(agent.to_string()),
        };
        store
            .insert_chats(&[chat("a1", 12.0), chat("a1", 3.0), chat("a2", 0.0)])
            .await
            .unwrap();

        let query = AgentQuery::new(TimeColumn::Assign, march_first(), Bucketing::Date)
            .responded_only();
        let sightings = store.agent_sightings(&query).await.unwrap();
        assert_eq!(sightings.len(), 1);
        assert_eq!(sightings[0].agent_id, "a1");
    }

    #[tokio::test]
    async fn test_classifications_shift_into_report_offset() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let request = |created: &str, queue: &str, paths: &[&str]| RequestRecord {
            created_date: format!("{}Z", created).parse().unwrap(),
            queue_name: queue.to_string(),
            event_type: "in".to_string(),
            classifiers: paths
                .iter()
                .map(|p| Classifier {
                    path: p.to_string(),
                })
                .collect(),
        };
        store
            .insert_requests(&[
                // 21:30 UTC on Dec 31 is already Jan 1 at +04:00
                request("2023-12-31T21:30:00", "m10", &["Root/Billing", "Root/Cards/Blocked"]),
                request("2024-01-01T20:30:00", "m10", &["Root/Late"]),
                request("2024-01-01T10:00:00", "WHATSAPP", &["Root/Chat"]),
            ])
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO requests (created_date, queue_name, type, classifiers) VALUES (?, ?, ?, ?)",
        )
        .bind("2024-01-01 08:00:00")
        .bind("m10")
        .bind("in")
        .bind("{not json")
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO requests (created_date, queue_name, type, classifiers) VALUES (?, ?, ?, ?)",
        )
        .bind("2024-01-01 09:00:00")
        .bind("m10")
        .bind("in")
        .bind(r#"[{"label":"x"},{"path":"Root/Ok"}]"#)
        .execute(store.pool())
        .await
        .unwrap();

        let filter = ClassificationFilter {
            event_type: EventType::In,
            queues: QueueFilter::new(["m10"]),
            range: DateRange::parse("2024-01-01", "2024-01-01").unwrap(),
        };
        let entries = store.classifications(&filter).await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["Root/Billing", "Root/Cards/Blocked", "Root/Ok"]);
        assert!(entries.iter().all(|e| e.report_date == date("2024-01-01")));

        let empty = ClassificationFilter {
            queues: QueueFilter::new(Vec::<String>::new()),
            ..filter
        };
        assert!(store.classifications(&empty).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_diagnostics() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store
            .insert_calls(&[
                call("m10", "in", "2024-03-01 09:00:00", 1.0),
                call("m10", "in", "2024-03-01 09:01:00", 1.0),
                call("m10-shikayet", "in", "2024-03-01 09:02:00", 1.0),
                call("m10-shikayet", "abandon", "2024-03-01 09:03:00", 1.0),
                call("m10-shikayet", "in", "2024-03-01 09:04:00", 1.0),
            ])
            .await
            .unwrap();

        let counts = store.queue_counts(&march_first()).await.unwrap();
        assert_eq!(counts[0].queue_name, "m10-shikayet");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].count, 2);

        let aml = store
            .queue_daily_breakdown(&march_first(), "m10-shikayet")
            .await
            .unwrap();
        assert_eq!(
            aml,
            vec![AmlDailyStats {
                date: date("2024-03-01"),
                total_calls: 3,
                incoming_calls: 2,
                abandoned_calls: 1,
            }]
        );
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.ping().await.unwrap();

        store.close().await;
        assert!(matches!(store.ping().await, Err(Error::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reopen.db");
        {
            let store = SqliteRecordStore::open(&path, 1).await.unwrap();
            store
                .insert_calls(&[call("m10", "in", "2024-03-01 09:00:00", 1.0)])
                .await
                .unwrap();
            store.close().await;
        }
        let store = SqliteRecordStore::open(&path, 1).await.unwrap();
        let counts = store.queue_counts(&march_first()).await.unwrap();
        assert_eq!(counts.len(), 1);
    }
}
