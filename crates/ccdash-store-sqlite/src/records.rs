//! Raw record shapes accepted by the store's writer
//!
//! The reporting engine never writes; these exist so fixtures and local
//! exports can be loaded into a database.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of `call_report`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub queue_name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(with = "wall_clock")]
    pub enter_queue_date: NaiveDateTime,
    #[serde(default, with = "wall_clock::option")]
    pub answer_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub call_duration: Option<f64>,
    #[serde(default)]
    pub queue_wait_time: f64,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// One row of `chat_report`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(with = "wall_clock")]
    pub created_date: NaiveDateTime,
    #[serde(default, with = "wall_clock::option")]
    pub assign_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub chat_frt: Option<f64>,
    #[serde(default)]
    pub resolution_time_total: Option<f64>,
    #[serde(default)]
    pub agent_frt: Option<f64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    pub path: String,
}

/// A request document with its classifier array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub created_date: DateTime<Utc>,
    pub queue_name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub classifiers: Vec<Classifier>,
}

/// `YYYY-MM-DD HH:MM:SS` local timestamps
///
/// Also accepts the `T`-separated ISO form on input.
pub(crate) mod wall_clock {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::sql::TIMESTAMP_FORMAT;

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if raw.is_empty() => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw))),
                None => Ok(None),
            }
        }
    }
}
