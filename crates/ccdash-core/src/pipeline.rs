//! Typed classification aggregation pipeline
//!
//! Classification reports are a fixed sequence of stages over unwound
//! classification entries: filter by type/queue/date, parse the path into
//! topic and subtopic, optionally filter by topic, group, then sort. Each
//! stage is a closed enum variant with typed fields.
//!
//! A store adapter pushes the leading [`Stage::Unwind`] and source
//! [`Stage::Match`] down into its native query (see
//! [`Pipeline::source_filter`]); [`Pipeline::run`] evaluates the full
//! sequence over the entries the store returns. Re-applying the source match
//! in memory is harmless, so adapters that cannot push it down stay correct.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::classification::parse_path;
use crate::queue::QueueFilter;
use crate::types::{DateRange, EventType};

/// One classification of one event, after unwinding the event's classifier
/// array and deriving its report date in the reporting offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    pub report_date: NaiveDate,
    pub queue: String,
    pub event_type: EventType,
    pub path: String,
}

/// Store-side filter derived from the source stages of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationFilter {
    pub event_type: EventType,
    pub queues: QueueFilter,
    pub range: DateRange,
}

impl ClassificationFilter {
    pub fn matches(&self, entry: &ClassificationEntry) -> bool {
        entry.event_type == self.event_type
            && self.queues.matches(&entry.queue)
            && self.range.contains(entry.report_date)
    }
}

/// Row predicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Event type, queue membership and report-date range
    Source(ClassificationFilter),
    /// Parsed topic equals the value exactly (case-sensitive, post-trim)
    Topic { topic: String },
}

/// Fields kept by a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    TopicAndSubtopic,
    TopicOnly,
}

/// Composite grouping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    DateTopicSubtopic,
    DateTopic,
    Topic,
}

/// Output orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// date, topic, subtopic ascending
    DateTopicSubtopic,
    /// date ascending, then total descending
    DateThenTotalDesc,
    /// topic ascending
    Topic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// One row per classifier of an event
    Unwind,
    Match(Predicate),
    Project(Projection),
    Group(GroupKey),
    Sort(SortKey),
}

/// A row flowing between stages
///
/// Fields dropped by a projection or group stage are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WorkingRow {
    report_date: Option<NaiveDate>,
    queue: Option<String>,
    event_type: Option<EventType>,
    path: Option<String>,
    topic: Option<String>,
    subtopic: Option<String>,
    total: u64,
}

impl From<ClassificationEntry> for WorkingRow {
    fn from(entry: ClassificationEntry) -> Self {
        Self {
            report_date: Some(entry.report_date),
            queue: Some(entry.queue),
            event_type: Some(entry.event_type),
            path: Some(entry.path),
            topic: None,
            subtopic: None,
            total: 1,
        }
    }
}

/// Grouped output of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedRow {
    pub report_date: Option<NaiveDate>,
    pub topic: String,
    pub subtopic: Option<String>,
    pub total: u64,
}

/// Ordered sequence of stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unwind and source match, the prefix every classification report shares
    pub fn from_source(filter: ClassificationFilter) -> Self {
        Self::new()
            .stage(Stage::Unwind)
            .stage(Stage::Match(Predicate::Source(filter)))
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The source filter a store can push down, if the pipeline has one
    pub fn source_filter(&self) -> Option<&ClassificationFilter> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Match(Predicate::Source(filter)) => Some(filter),
            _ => None,
        })
    }

    /// Evaluate every stage over unwound entries
    ///
    /// Rows that reach the end without a topic (no projection stage) are
    /// dropped, since they cannot form a report row.
    pub fn run(&self, entries: Vec<ClassificationEntry>) -> Vec<GroupedRow> {
        let mut rows: Vec<WorkingRow> = entries.into_iter().map(WorkingRow::from).collect();

        for stage in &self.stages {
            rows = match stage {
                Stage::Unwind => rows,
                Stage::Match(predicate) => rows
                    .into_iter()
                    .filter(|row| matches_predicate(predicate, row))
                    .collect(),
                Stage::Project(projection) => rows
                    .into_iter()
                    .map(|row| project(*projection, row))
                    .collect(),
                Stage::Group(key) => group(*key, rows),
                Stage::Sort(key) => {
                    rows.sort_by(|a, b| compare(*key, a, b));
                    rows
                }
            };
        }

        rows.into_iter()
            .filter_map(|row| {
                Some(GroupedRow {
                    report_date: row.report_date,
                    topic: row.topic?,
                    subtopic: row.subtopic,
                    total: row.total,
                })
            })
            .collect()
    }
}

fn matches_predicate(predicate: &Predicate, row: &WorkingRow) -> bool {
    match predicate {
        Predicate::Source(filter) => {
            row.event_type.as_ref() == Some(&filter.event_type)
                && row.queue.as_deref().is_some_and(|q| filter.queues.matches(q))
                && row.report_date.is_some_and(|d| filter.range.contains(d))
        }
        Predicate::Topic { topic } => row.topic.as_deref() == Some(topic.as_str()),
    }
}

fn project(projection: Projection, mut row: WorkingRow) -> WorkingRow {
    let Some(path) = row.path.take() else {
        return row;
    };
    let parsed = parse_path(&path);
    row.topic = Some(parsed.topic);
    row.subtopic = match projection {
        Projection::TopicAndSubtopic => Some(parsed.subtopic),
        Projection::TopicOnly => None,
    };
    row
}

fn group(key: GroupKey, rows: Vec<WorkingRow>) -> Vec<WorkingRow> {
    type Key = (Option<NaiveDate>, Option<String>, Option<String>);
    let mut groups: BTreeMap<Key, u64> = BTreeMap::new();

    for row in rows {
        let group_key: Key = match key {
            GroupKey::DateTopicSubtopic => (row.report_date, row.topic, row.subtopic),
            GroupKey::DateTopic => (row.report_date, row.topic, None),
            GroupKey::Topic => (None, row.topic, None),
        };
        *groups.entry(group_key).or_default() += row.total;
    }

    groups
        .into_iter()
        .map(|((report_date, topic, subtopic), total)| WorkingRow {
            report_date,
            queue: None,
            event_type: None,
            path: None,
            topic,
            subtopic,
            total: match key {
                // distinct-topic groups carry no count
                GroupKey::Topic => 0,
                _ => total,
            },
        })
        .collect()
}

fn compare(key: SortKey, a: &WorkingRow, b: &WorkingRow) -> Ordering {
    match key {
        SortKey::DateTopicSubtopic => a
            .report_date
            .cmp(&b.report_date)
            .then_with(|| a.topic.cmp(&b.topic))
            .then_with(|| a.subtopic.cmp(&b.subtopic)),
        SortKey::DateThenTotalDesc => a
            .report_date
            .cmp(&b.report_date)
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.topic.cmp(&b.topic)),
        SortKey::Topic => a.topic.cmp(&b.topic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(day: &str, queue: &str, path: &str) -> ClassificationEntry {
        ClassificationEntry {
            report_date: date(day),
            queue: queue.to_string(),
            event_type: EventType::In,
            path: path.to_string(),
        }
    }

    fn source(queues: &[&str]) -> ClassificationFilter {
        ClassificationFilter {
            event_type: EventType::In,
            queues: QueueFilter::new(queues.iter().copied()),
            range: DateRange::parse("2024-01-01", "2024-01-31").unwrap(),
        }
    }

    #[test]
    fn test_full_breakdown_groups_and_sorts() {
        let pipeline = Pipeline::from_source(source(&["m10"]))
            .stage(Stage::Project(Projection::TopicAndSubtopic))
            .stage(Stage::Group(GroupKey::DateTopicSubtopic))
            .stage(Stage::Sort(SortKey::DateTopicSubtopic));

        let rows = pipeline.run(vec![
            entry("2024-01-02", "m10", "Root/Cards/Blocked"),
            entry("2024-01-01", "m10", "Root/Loans"),
            entry("2024-01-02", "m10", "Root/Cards/Blocked"),
            entry("2024-01-02", "m10", "Root/Cards/Issued"),
            entry("2024-01-02", "WHATSAPP", "Root/Cards/Blocked"),
        ]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].report_date, Some(date("2024-01-01")));
        assert_eq!(rows[0].topic, "Loans");
        assert_eq!(rows[0].subtopic.as_deref(), Some(""));
        assert_eq!(rows[1].subtopic.as_deref(), Some("Blocked"));
        assert_eq!(rows[1].total, 2);
        assert_eq!(rows[2].subtopic.as_deref(), Some("Issued"));
    }

    #[test]
    fn test_source_match_filters_out_of_range_dates() {
        let pipeline = Pipeline::from_source(source(&["m10"]))
            .stage(Stage::Project(Projection::TopicOnly))
            .stage(Stage::Group(GroupKey::DateTopic));

        let rows = pipeline.run(vec![
            entry("2023-12-31", "m10", "Root/Cards"),
            entry("2024-01-31", "m10", "Root/Cards"),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].report_date, Some(date("2024-01-31")));
    }

    #[test]
    fn test_topic_match_is_exact() {
        let pipeline = Pipeline::from_source(source(&["m10"]))
            .stage(Stage::Project(Projection::TopicAndSubtopic))
            .stage(Stage::Match(Predicate::Topic {
                topic: "Cards".to_string(),
            }))
            .stage(Stage::Group(GroupKey::DateTopicSubtopic));

        let rows = pipeline.run(vec![
            entry("2024-01-01", "m10", "Root/ Cards /Blocked"),
            entry("2024-01-01", "m10", "Root/cards/Blocked"),
            entry("2024-01-01", "m10", "Root/Loans/Late"),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].topic, "Cards");
    }

    #[test]
    fn test_distinct_topics_sorted() {
        let pipeline = Pipeline::from_source(source(&["m10"]))
            .stage(Stage::Project(Projection::TopicOnly))
            .stage(Stage::Group(GroupKey::Topic))
            .stage(Stage::Sort(SortKey::Topic));

        let rows = pipeline.run(vec![
            entry("2024-01-03", "m10", "Root/Loans"),
            entry("2024-01-01", "m10", "Root/Cards/X"),
            entry("2024-01-02", "m10", "Root/Loans/Y"),
        ]);
        let topics: Vec<&str> = rows.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, ["Cards", "Loans"]);
        assert!(rows.iter().all(|r| r.report_date.is_none()));
    }

    #[test]
    fn test_sort_by_total_desc_within_date() {
        let pipeline = Pipeline::from_source(source(&["m10"]))
            .stage(Stage::Project(Projection::TopicOnly))
            .stage(Stage::Group(GroupKey::DateTopic))
            .stage(Stage::Sort(SortKey::DateThenTotalDesc));

        let rows = pipeline.run(vec![
            entry("2024-01-01", "m10", "Root/A"),
            entry("2024-01-01", "m10", "Root/B"),
            entry("2024-01-01", "m10", "Root/B"),
            entry("2024-01-02", "m10", "Root/A"),
        ]);
        assert_eq!(rows[0].topic, "B");
        assert_eq!(rows[0].total, 2);
        assert_eq!(rows[1].topic, "A");
        assert_eq!(rows[2].report_date, Some(date("2024-01-02")));
    }

    #[test]
    fn test_source_filter_is_discoverable() {
        let filter = source(&["m10"]);
        let pipeline = Pipeline::from_source(filter.clone());
        assert_eq!(pipeline.source_filter(), Some(&filter));
        assert!(Pipeline::new().source_filter().is_none());
    }
}
