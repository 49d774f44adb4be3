//! Shared request types: date ranges, granularities, channels and event types

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Number of hour buckets in a day
pub const HOURS_PER_DAY: usize = 24;

/// Format used for date keys in every report
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-date range of a report request
///
/// The range is passed through to the store as query bounds; no check is
/// made that `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering a single calendar date
    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// Parse `YYYY-MM-DD` endpoints
    ///
    /// # Errors
    /// - `Error::InvalidRequest` if either endpoint is not a calendar date
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |value: &str| {
            NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
                .map_err(|e| Error::InvalidRequest(format!("invalid date '{}': {}", value, e)))
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }

    /// Start of the range floored to 00:00:00
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// End of the range ceiled to 23:59:59
    pub fn upper_bound(&self) -> NaiveDateTime {
        self.end
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
    }

    /// UTC instants covering the range when dates are read in the given offset
    pub fn utc_window(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        let to_utc = |local: NaiveDateTime| match offset.from_local_datetime(&local) {
            chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
            _ => Utc.from_utc_datetime(&local),
        };
        (to_utc(self.lower_bound()), to_utc(self.upper_bound()))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Time bucketing of a KPI report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
    Hourly,
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            "hourly" => Ok(Self::Hourly),
            other => Err(Error::InvalidRequest(format!("unknown granularity '{}'", other))),
        }
    }
}

/// Contact channel a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Call,
    Chat,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Call => write!(f, "call"),
            Channel::Chat => write!(f, "chat"),
        }
    }
}

/// Event type column shared by call, chat and classification records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    In,
    Abandon,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::In => "in",
            EventType::Abandon => "abandon",
            EventType::Other(s) => s,
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "in" => EventType::In,
            "abandon" => EventType::Abandon,
            _ => EventType::Other(value),
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        EventType::from(value.to_string())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset
///
/// # Errors
/// - `Error::Config` if the value is not a valid offset
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    value
        .parse::<FixedOffset>()
        .map_err(|e| Error::Config(format!("invalid UTC offset '{}': {}", value, e)))
}
