//! Typed KPI query model
//!
//! A [`KpiQuery`] describes one range+filter+group aggregation over the call
//! or chat event tables: which timestamp column keys the buckets, which event
//! types and queues are included, how rows are bucketed and which single
//! measure is computed per bucket. Store adapters translate it into their
//! native query language.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::queue::QueueFilter;
use crate::types::{DateRange, EventType, HOURS_PER_DAY};

/// Default service-level wait threshold in seconds
pub const DEFAULT_SL_THRESHOLD_SECS: i64 = 20;

/// Event table a query reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Calls,
    Chats,
}

/// Timestamp column that supplies the date/hour key of a bucket
///
/// Entry time keys volume, SL and abandonment; answer/assign time keys
/// durations and agent activity. Mixing them changes results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeColumn {
    /// Call entered the queue
    EnterQueue,
    /// Call answered by an agent
    Answer,
    /// Chat created
    Created,
    /// Chat assigned to an agent
    Assign,
}

impl TimeColumn {
    pub fn source(&self) -> EventSource {
        match self {
            TimeColumn::EnterQueue | TimeColumn::Answer => EventSource::Calls,
            TimeColumn::Created | TimeColumn::Assign => EventSource::Chats,
        }
    }
}

/// Numeric duration fields that can be averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationField {
    /// Call handling duration
    CallDuration,
    /// Chat first-response time
    ChatFrt,
    /// Chat total resolution time
    ResolutionTime,
}

impl DurationField {
    pub fn source(&self) -> EventSource {
        match self {
            DurationField::CallDuration => EventSource::Calls,
            DurationField::ChatFrt | DurationField::ResolutionTime => EventSource::Chats,
        }
    }
}

/// Value computed for each bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measure {
    /// Number of matching rows
    Count,
    /// Mean of a duration field in seconds, `None` when no row has a value
    Average { field: DurationField },
    /// Percentage of `in` rows with queue wait at or under the threshold,
    /// `None` when the bucket has no `in` rows
    ServiceLevel { threshold_secs: i64 },
}

/// How matching rows are grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bucketing {
    /// One bucket per calendar date
    Date,
    /// One bucket per day-of-month; the same day number in different months
    /// shares a bucket
    DayOfMonth,
    /// One bucket per (date, hour) with `buckets` hour slots per date
    HourOfDay { buckets: usize },
}

impl Bucketing {
    pub fn hourly() -> Self {
        Bucketing::HourOfDay {
            buckets: HOURS_PER_DAY,
        }
    }
}

/// Key of one aggregated bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BucketKey {
    Date { date: NaiveDate },
    DayOfMonth { day: u32 },
    DateHour { date: NaiveDate, hour: u32 },
}

/// One aggregated bucket returned by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRow {
    pub key: BucketKey,
    pub value: Option<f64>,
}

impl BucketRow {
    pub fn new(key: BucketKey, value: Option<f64>) -> Self {
        Self { key, value }
    }
}

/// A single range+filter+group aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiQuery {
    pub time_column: TimeColumn,
    pub range: DateRange,
    pub event_types: Vec<EventType>,
    /// `None` for tables that are not queue-partitioned
    pub queues: Option<QueueFilter>,
    pub bucketing: Bucketing,
    pub measure: Measure,
}

impl KpiQuery {
    /// Count rows keyed by `time_column` per calendar date
    pub fn new(time_column: TimeColumn, range: DateRange) -> Self {
        Self {
            time_column,
            range,
            event_types: Vec::new(),
            queues: None,
            bucketing: Bucketing::Date,
            measure: Measure::Count,
        }
    }

    pub fn source(&self) -> EventSource {
        self.time_column.source()
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    pub fn with_queues(mut self, queues: QueueFilter) -> Self {
        self.queues = Some(queues);
        self
    }

    pub fn with_bucketing(mut self, bucketing: Bucketing) -> Self {
        self.bucketing = bucketing;
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    /// Whether the query can only match nothing
    ///
    /// An explicit empty queue filter selects no rows.
    pub fn is_empty(&self) -> bool {
        self.queues.as_ref().is_some_and(QueueFilter::is_empty)
    }
}

/// Distinct (bucket, agent) pairs of agent activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentQuery {
    pub time_column: TimeColumn,
    pub range: DateRange,
    pub event_types: Vec<EventType>,
    pub queues: Option<QueueFilter>,
    pub bucketing: Bucketing,
    /// Only count chats where the agent actually responded (`agent_frt > 0`)
    pub require_agent_response: bool,
}

impl AgentQuery {
    pub fn new(time_column: TimeColumn, range: DateRange, bucketing: Bucketing) -> Self {
        Self {
            time_column,
            range,
            event_types: Vec::new(),
            queues: None,
            bucketing,
            require_agent_response: false,
        }
    }

    pub fn source(&self) -> EventSource {
        self.time_column.source()
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    pub fn with_queues(mut self, queues: QueueFilter) -> Self {
        self.queues = Some(queues);
        self
    }

    pub fn responded_only(mut self) -> Self {
        self.require_agent_response = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.queues.as_ref().is_some_and(QueueFilter::is_empty)
    }
}

/// An agent seen active in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSighting {
    pub key: BucketKey,
    pub agent_id: String,
}
