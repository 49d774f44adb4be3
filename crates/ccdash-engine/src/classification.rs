//! Classification aggregation
//!
//! Each mode is a typed [`Pipeline`] over unwound classification entries.
//! The store evaluates the source filter; grouping, ratios and channel merges
//! happen here.

use std::collections::BTreeMap;
use std::sync::Arc;

use ccdash_core::pipeline::{
    ClassificationFilter, GroupKey, GroupedRow, Pipeline, Predicate, Projection, SortKey, Stage,
};
use ccdash_core::report::{ClassifierRow, TopicName, TopicRow};
use ccdash_core::{
    Channel, DateRange, Error, EventType, QueueFilter, RecordStore, ReportObserver, Result,
};
use chrono::NaiveDate;
use tracing::debug;

use crate::context::{RequestContext, observed_step};

/// Shape of a classification report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationMode {
    /// Counts per (date, topic, subtopic) for one channel
    Full(Channel),
    /// Counts per (date, topic) with each topic's share of the day
    Topics,
    /// Distinct topics in the range
    AvailableTopics,
    /// `Full`, restricted to one topic
    SubtopicsForTopic(String),
    /// Call and chat `Full` breakdowns summed by key
    ///
    /// The aggregate's `queues` argument is the call-side filter.
    Combined { chat_queues: QueueFilter },
}

impl ClassificationMode {
    fn step(&self) -> &'static str {
        match self {
            ClassificationMode::Full(Channel::Call) => "call_classifiers",
            ClassificationMode::Full(Channel::Chat) => "chat_classifiers",
            ClassificationMode::Topics => "topics",
            ClassificationMode::AvailableTopics => "available_topics",
            ClassificationMode::SubtopicsForTopic(_) => "subtopics",
            ClassificationMode::Combined { .. } => "overall_classifiers",
        }
    }

    /// Stages after the shared unwind/match prefix
    fn pipeline(&self, filter: ClassificationFilter) -> Pipeline {
        let source = Pipeline::from_source(filter);
        match self {
            ClassificationMode::Full(_) | ClassificationMode::Combined { .. } => source
                .stage(Stage::Project(Projection::TopicAndSubtopic))
                .stage(Stage::Group(GroupKey::DateTopicSubtopic))
                .stage(Stage::Sort(SortKey::DateTopicSubtopic)),
            ClassificationMode::Topics => source
                .stage(Stage::Project(Projection::TopicOnly))
                .stage(Stage::Group(GroupKey::DateTopic))
                .stage(Stage::Sort(SortKey::DateThenTotalDesc)),
            ClassificationMode::AvailableTopics => source
                .stage(Stage::Project(Projection::TopicOnly))
                .stage(Stage::Group(GroupKey::Topic))
                .stage(Stage::Sort(SortKey::Topic)),
            ClassificationMode::SubtopicsForTopic(topic) => source
                .stage(Stage::Project(Projection::TopicAndSubtopic))
                .stage(Stage::Match(Predicate::Topic {
                    topic: topic.clone(),
                }))
                .stage(Stage::Group(GroupKey::DateTopicSubtopic))
                .stage(Stage::Sort(SortKey::DateTopicSubtopic)),
        }
    }
}

/// Rows of one classification report
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationRows {
    Classifiers(Vec<ClassifierRow>),
    Topics(Vec<TopicRow>),
    TopicNames(Vec<TopicName>),
}

impl ClassificationRows {
    pub fn into_classifiers(self) -> Result<Vec<ClassifierRow>> {
        match self {
            ClassificationRows::Classifiers(rows) => Ok(rows),
            other => Err(other.mismatch("classifier")),
        }
    }

    pub fn into_topics(self) -> Result<Vec<TopicRow>> {
        match self {
            ClassificationRows::Topics(rows) => Ok(rows),
            other => Err(other.mismatch("topic")),
        }
    }

    pub fn into_topic_names(self) -> Result<Vec<TopicName>> {
        match self {
            ClassificationRows::TopicNames(rows) => Ok(rows),
            other => Err(other.mismatch("topic name")),
        }
    }

    fn mismatch(&self, wanted: &str) -> Error {
        let got = match self {
            ClassificationRows::Classifiers(_) => "classifier",
            ClassificationRows::Topics(_) => "topic",
            ClassificationRows::TopicNames(_) => "topic name",
        };
        Error::InvalidRequest(format!("expected {} rows, got {} rows", wanted, got))
    }
}

pub struct ClassificationAggregator {
    store: Arc<dyn RecordStore>,
    observer: Arc<dyn ReportObserver>,
}

impl ClassificationAggregator {
    pub fn new(store: Arc<dyn RecordStore>, observer: Arc<dyn ReportObserver>) -> Self {
        Self { store, observer }
    }

    /// Run `mode` over classifications of `in` events in `queues`
    ///
    /// An empty queue filter is a defined empty result; the store is not
    /// consulted.
    pub async fn aggregate(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        mode: &ClassificationMode,
    ) -> Result<ClassificationRows> {
        if let ClassificationMode::Combined { chat_queues } = mode {
            let call_mode = ClassificationMode::Full(Channel::Call);
            let chat_mode = ClassificationMode::Full(Channel::Chat);
            let (call_rows, chat_rows) = futures::try_join!(
                self.run(ctx, range, queues, &call_mode),
                self.run(ctx, range, chat_queues, &chat_mode),
            )?;
            return Ok(ClassificationRows::Classifiers(combine(
                classifier_rows(call_rows),
                classifier_rows(chat_rows),
            )));
        }

        let grouped = self.run(ctx, range, queues, mode).await?;
        Ok(match mode {
            ClassificationMode::Topics => ClassificationRows::Topics(topic_rows(grouped)),
            ClassificationMode::AvailableTopics => ClassificationRows::TopicNames(
                grouped
                    .into_iter()
                    .map(|row| TopicName { topic: row.topic })
                    .collect(),
            ),
            _ => ClassificationRows::Classifiers(classifier_rows(grouped)),
        })
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        mode: &ClassificationMode,
    ) -> Result<Vec<GroupedRow>> {
        let step = mode.step();
        if queues.is_empty() {
            debug!(step, "empty queue filter, skipping store");
            return Ok(Vec::new());
        }

        let filter = ClassificationFilter {
            event_type: EventType::In,
            queues: queues.clone(),
            range,
        };
        let pipeline = mode.pipeline(filter.clone());
        let entries = observed_step(
            self.observer.as_ref(),
            ctx,
            step,
            self.store.classifications(&filter),
        )
        .await?;
        debug!(step, entries = entries.len(), "classification entries fetched");
        Ok(pipeline.run(entries))
    }
}

/// Merge two breakdowns, summing totals of identical keys
///
/// The result is ordered by (date, topic, subtopic).
fn combine(call_rows: Vec<ClassifierRow>, chat_rows: Vec<ClassifierRow>) -> Vec<ClassifierRow> {
    let mut merged: BTreeMap<(NaiveDate, String, String), u64> = BTreeMap::new();
    for row in call_rows.into_iter().chain(chat_rows) {
        *merged
            .entry((row.report_date, row.topic, row.subtopic))
            .or_default() += row.total;
    }
    merged
        .into_iter()
        .map(|((report_date, topic, subtopic), total)| ClassifierRow {
            report_date,
            topic,
            subtopic,
            total,
        })
        .collect()
}

fn classifier_rows(grouped: Vec<GroupedRow>) -> Vec<ClassifierRow> {
    grouped
        .into_iter()
        .filter_map(|row| {
            Some(ClassifierRow {
                report_date: row.report_date?,
                topic: row.topic,
                subtopic: row.subtopic.unwrap_or_default(),
                total: row.total,
            })
        })
        .collect()
}

/// Attach each topic's share of its date's grand total
fn topic_rows(grouped: Vec<GroupedRow>) -> Vec<TopicRow> {
    let mut day_totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in &grouped {
        if let Some(date) = row.report_date {
            *day_totals.entry(date).or_default() += row.total;
        }
    }

    grouped
        .into_iter()
        .filter_map(|row| {
            let report_date = row.report_date?;
            let day_total = day_totals.get(&report_date).copied().unwrap_or(0);
            let ratio = if day_total > 0 {
                row.total as f64 / day_total as f64 * 100.0
            } else {
                0.0
            };
            Some(TopicRow {
                report_date,
                topic: row.topic,
                total: row.total,
                ratio,
            })
        })
        .collect()
}
