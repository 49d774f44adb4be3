//! Report row types
//!
//! Every report mode has a fixed, documented row shape. Rows are plain data
//! and are serialized at the boundary; field names are stable across modes.

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::types::HOURS_PER_DAY;

/// Stable report type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Daily,
    Monthly,
    Hourly,
    CallClassifiers,
    ChatClassifiers,
    OverallClassifiers,
    Topics,
    AvailableTopics,
    SubtopicsDaily,
    QueueStats,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Monthly => "monthly",
            ReportKind::Hourly => "hourly",
            ReportKind::CallClassifiers => "call_classifiers",
            ReportKind::ChatClassifiers => "chat_classifiers",
            ReportKind::OverallClassifiers => "overall_classifiers",
            ReportKind::Topics => "topics",
            ReportKind::AvailableTopics => "available_topics",
            ReportKind::SubtopicsDaily => "subtopics_daily",
            ReportKind::QueueStats => "queue_stats",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished report: its kind tag and rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report<T> {
    pub kind: ReportKind,
    pub data: Vec<T>,
}

impl<T> Report<T> {
    pub fn new(kind: ReportKind, data: Vec<T>) -> Self {
        Self { kind, data }
    }

    pub fn empty(kind: ReportKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// KPI columns shared by daily and monthly rows
///
/// Durations are `HH:MM:SS`. A duration or SL with no qualifying rows is
/// `None`; counts default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_calls: u64,
    pub aht: Option<String>,
    pub sl: Option<f64>,
    pub total_abandoned: u64,
    pub total_chats: u64,
    pub avg_chat_frt: Option<String>,
    pub resolution_time_avg: Option<String>,
    pub distinct_agents: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: KpiSummary,
}

/// Monthly rows are keyed by day-of-month only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub day: u32,
    #[serde(flatten)]
    pub summary: KpiSummary,
}

/// One calendar date of an hourly report
///
/// Serializes as `{"date": ..., "hour_0": ..., ..., "hour_23": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRow {
    pub date: NaiveDate,
    values: [f64; HOURS_PER_DAY],
}

impl HourlyRow {
    /// A row with every hour at zero
    pub fn zeroed(date: NaiveDate) -> Self {
        Self {
            date,
            values: [0.0; HOURS_PER_DAY],
        }
    }

    /// Value of `hour`, zero when out of range
    pub fn hour(&self, hour: usize) -> f64 {
        self.values.get(hour).copied().unwrap_or(0.0)
    }

    /// Set `hour`; out-of-range hours are ignored
    pub fn set(&mut self, hour: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(hour) {
            *slot = value;
        }
    }

    pub fn add(&mut self, hour: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(hour) {
            *slot += value;
        }
    }

    /// `(hour, value)` pairs in hour order
    pub fn pairs(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().copied().enumerate()
    }

    pub fn values(&self) -> &[f64; HOURS_PER_DAY] {
        &self.values
    }
}

impl Serialize for HourlyRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(HOURS_PER_DAY + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (hour, value) in self.pairs() {
            map.serialize_entry(&format!("hour_{}", hour), &value)?;
        }
        map.end()
    }
}

/// Full classification breakdown row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifierRow {
    pub report_date: NaiveDate,
    pub topic: String,
    pub subtopic: String,
    pub total: u64,
}

/// Per-date topic count with its share of the day's total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRow {
    pub report_date: NaiveDate,
    pub topic: String,
    pub total: u64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicName {
    pub topic: String,
}

/// Row count of one raw queue identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCount {
    pub queue_name: String,
    pub count: u64,
}

/// Per-date volume of a single queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmlDailyStats {
    pub date: NaiveDate,
    pub total_calls: u64,
    pub incoming_calls: u64,
    pub abandoned_calls: u64,
}

/// Queue diagnostics report body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queues: Vec<QueueCount>,
    pub aml_by_date: Vec<AmlDailyStats>,
}

/// Result of a store liveness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Render seconds as `HH:MM:SS`, rounding to the nearest second
///
/// Hours are not wrapped at 24. Negative or non-finite input renders as
/// zero.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
