//! Translation of typed KPI queries into SQLite statements

use ccdash_core::kpi::{
    AgentQuery, Bucketing, DurationField, EventSource, KpiQuery, Measure, TimeColumn,
};
use ccdash_core::{DateRange, Error, EventType, QueueFilter, Result};
use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

/// Timestamp layout of call and chat columns
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Bind {
    Text(String),
    Int(i64),
}

/// A statement with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub binds: Vec<Bind>,
}

impl Statement {
    pub(crate) fn query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        let mut query = sqlx::query(&self.sql);
        for bind in &self.binds {
            query = match bind {
                Bind::Text(value) => query.bind(value.as_str()),
                Bind::Int(value) => query.bind(*value),
            };
        }
        query
    }
}

pub(crate) fn table(source: EventSource) -> &'static str {
    match source {
        EventSource::Calls => "call_report",
        EventSource::Chats => "chat_report",
    }
}

pub(crate) fn time_column(column: TimeColumn) -> &'static str {
    match column {
        TimeColumn::EnterQueue => "enter_queue_date",
        TimeColumn::Answer => "answer_date",
        TimeColumn::Created => "created_date",
        TimeColumn::Assign => "assign_date",
    }
}

fn duration_column(field: DurationField) -> &'static str {
    match field {
        DurationField::CallDuration => "call_duration",
        DurationField::ChatFrt => "chat_frt",
        DurationField::ResolutionTime => "resolution_time_total",
    }
}

/// Select expressions and GROUP BY list for a bucketing
fn bucket_exprs(bucketing: Bucketing, column: &str) -> (String, &'static str) {
    match bucketing {
        Bucketing::Date => (format!("DATE({}) AS bucket_date", column), "bucket_date"),
        Bucketing::DayOfMonth => (
            format!("CAST(strftime('%d', {}) AS INTEGER) AS bucket_day", column),
            "bucket_day",
        ),
        Bucketing::HourOfDay { .. } => (
            format!(
                "DATE({col}) AS bucket_date, CAST(strftime('%H', {col}) AS INTEGER) AS bucket_hour",
                col = column
            ),
            "bucket_date, bucket_hour",
        ),
    }
}

/// WHERE conditions shared by aggregate and agent statements
struct Conditions {
    clauses: Vec<String>,
    binds: Vec<Bind>,
}

impl Conditions {
    fn new(
        source: EventSource,
        column: &str,
        range: &DateRange,
        event_types: &[EventType],
        queues: Option<&QueueFilter>,
    ) -> Self {
        let mut clauses = vec![format!("{} BETWEEN ? AND ?", column)];
        let mut binds = vec![
            Bind::Text(range.lower_bound().format(TIMESTAMP_FORMAT).to_string()),
            Bind::Text(range.upper_bound().format(TIMESTAMP_FORMAT).to_string()),
        ];

        if !event_types.is_empty() {
            clauses.push(format!("type IN ({})", placeholders(event_types.len())));
            binds.extend(
                event_types
                    .iter()
                    .map(|t| Bind::Text(t.as_str().to_string())),
            );
        }

        // chat events are not queue-partitioned
        if let (EventSource::Calls, Some(queues)) = (source, queues) {
            if queues.is_empty() {
                clauses.push("1 = 0".to_string());
            } else {
                clauses.push(format!("queue_name IN ({})", placeholders(queues.queues().len())));
                binds.extend(queues.queues().iter().cloned().map(Bind::Text));
            }
        }

        Self { clauses, binds }
    }

    fn push(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    fn sql(&self) -> String {
        self.clauses.join(" AND ")
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Build the statement for one KPI aggregation
///
/// Columns: the bucket columns (`bucket_date`, `bucket_day`, `bucket_hour`)
/// and `value` as REAL or NULL.
///
/// # Errors
/// - `Error::InvalidRequest` if the measure does not exist on the query's table
pub(crate) fn aggregate_statement(query: &KpiQuery) -> Result<Statement> {
    let source = query.source();
    let column = time_column(query.time_column);
    let (bucket_select, group_by) = bucket_exprs(query.bucketing, column);

    let mut binds = Vec::new();
    let measure = match query.measure {
        Measure::Count => "CAST(COUNT(*) AS REAL)".to_string(),
        Measure::Average { field } => {
            if field.source() != source {
                return Err(Error::InvalidRequest(format!(
                    "{} is not a column of {}",
                    duration_column(field),
                    table(source)
                )));
            }
            format!("CAST(AVG({}) AS REAL)", duration_column(field))
        }
        Measure::ServiceLevel { threshold_secs } => {
            if source != EventSource::Calls {
                return Err(Error::InvalidRequest(
                    "service level is only defined for calls".to_string(),
                ));
            }
            binds.push(Bind::Int(threshold_secs));
            "CAST(SUM(CASE WHEN queue_wait_time <= ? THEN 1 ELSE 0 END) AS REAL) * 100.0 \
             / NULLIF(COUNT(*), 0)"
                .to_string()
        }
    };

    let conditions = Conditions::new(
        source,
        column,
        &query.range,
        &query.event_types,
        query.queues.as_ref(),
    );
    binds.extend(conditions.binds.iter().cloned());

    let sql = format!(
        "SELECT {bucket}, {measure} AS value FROM {table} WHERE {filter} \
         GROUP BY {group} ORDER BY {group}",
        bucket = bucket_select,
        measure = measure,
        table = table(source),
        filter = conditions.sql(),
        group = group_by,
    );

    Ok(Statement { sql, binds })
}

/// Build the statement listing distinct (bucket, agent) pairs
pub(crate) fn agent_statement(query: &AgentQuery) -> Statement {
    let source = query.source();
    let column = time_column(query.time_column);
    let (bucket_select, _) = bucket_exprs(query.bucketing, column);

    let mut conditions = Conditions::new(
        source,
        column,
        &query.range,
        &query.event_types,
        query.queues.as_ref(),
    );
    conditions.push("user_id IS NOT NULL");
    conditions.push("user_id <> ''");
    if query.require_agent_response && source == EventSource::Chats {
        conditions.push("agent_frt > 0");
    }

    let sql = format!(
        "SELECT DISTINCT {bucket}, user_id AS agent_id FROM {table} WHERE {filter}",
        bucket = bucket_select,
        table = table(source),
        filter = conditions.sql(),
    );

    Statement {
        sql,
        binds: conditions.binds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::parse("2024-03-01", "2024-03-02").unwrap()
    }

    #[test]
    fn test_daily_count_statement() {
        let query = KpiQuery::new(TimeColumn::EnterQueue, range())
            .with_types([EventType::In, EventType::Abandon])
            .with_queues(QueueFilter::new(["m10", "m10-shikayet"]));
        let stmt = aggregate_statement(&query).unwrap();

        assert!(stmt.sql.contains("DATE(enter_queue_date) AS bucket_date"));
        assert!(stmt.sql.contains("FROM call_report"));
        assert!(stmt.sql.contains("type IN (?, ?)"));
        assert!(stmt.sql.contains("queue_name IN (?, ?)"));
        assert_eq!(
            stmt.binds,
            vec![
                Bind::Text("2024-03-01 00:00:00".into()),
                Bind::Text("2024-03-02 23:59:59".into()),
                Bind::Text("in".into()),
                Bind::Text("abandon".into()),
                Bind::Text("m10".into()),
                Bind::Text("m10-shikayet".into()),
            ]
        );
    }

    #[test]
    fn test_service_level_threshold_bound_first() {
        let query = KpiQuery::new(TimeColumn::EnterQueue, range())
            .with_types([EventType::In])
            .with_bucketing(Bucketing::hourly())
            .with_measure(Measure::ServiceLevel { threshold_secs: 20 });
        let stmt = aggregate_statement(&query).unwrap();

        assert!(stmt.sql.contains("NULLIF(COUNT(*), 0)"));
        assert!(stmt.sql.contains("strftime('%H', enter_queue_date)"));
        assert!(stmt.sql.contains("GROUP BY bucket_date, bucket_hour"));
        assert_eq!(stmt.binds[0], Bind::Int(20));
    }

    #[test]
    fn test_chat_queries_ignore_queue_filter() {
        let query = KpiQuery::new(TimeColumn::Assign, range())
            .with_queues(QueueFilter::new(["m10"]))
            .with_bucketing(Bucketing::DayOfMonth)
            .with_measure(Measure::Average {
                field: DurationField::ChatFrt,
            });
        let stmt = aggregate_statement(&query).unwrap();
        assert!(!stmt.sql.contains("queue_name"));
        assert!(stmt.sql.contains("AVG(chat_frt)"));
        assert!(stmt.sql.contains("strftime('%d', assign_date)"));
    }

    #[test]
    fn test_mismatched_measure_rejected() {
        let query = KpiQuery::new(TimeColumn::Created, range()).with_measure(Measure::Average {
            field: DurationField::CallDuration,
        });
        assert!(matches!(
            aggregate_statement(&query),
            Err(Error::InvalidRequest(_))
        ));

        let query = KpiQuery::new(TimeColumn::Assign, range())
            .with_measure(Measure::ServiceLevel { threshold_secs: 20 });
        assert!(aggregate_statement(&query).is_err());
    }

    #[test]
    fn test_agent_statement_filters_responders() {
        let query = AgentQuery::new(TimeColumn::Assign, range(), Bucketing::Date).responded_only();
        let stmt = agent_statement(&query);
        assert!(stmt.sql.starts_with("SELECT DISTINCT"));
        assert!(stmt.sql.contains("agent_frt > 0"));
        assert_eq!(stmt.binds.len(), 2);

        let calls = AgentQuery::new(TimeColumn::Answer, range(), Bucketing::Date)
            .with_types([EventType::In])
            .with_queues(QueueFilter::new(["m10"]));
        let stmt = agent_statement(&calls);
        assert!(!stmt.sql.contains("agent_frt"));
        assert!(stmt.sql.contains("answer_date BETWEEN ? AND ?"));
    }
}
