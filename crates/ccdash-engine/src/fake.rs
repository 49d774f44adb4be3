//! Hand-written record store for engine tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ccdash_core::kpi::{AgentQuery, AgentSighting, BucketRow, KpiQuery, TimeColumn};
use ccdash_core::pipeline::{ClassificationEntry, ClassificationFilter};
use ccdash_core::report::{AmlDailyStats, QueueCount};
use ccdash_core::{DateRange, Error, RecordStore, Result};

type Matcher = Box<dyn Fn(&KpiQuery) -> bool + Send + Sync>;

#[derive(Default)]
pub(crate) struct FakeStore {
    responses: Vec<(Matcher, Vec<BucketRow>)>,
    agents: Vec<(TimeColumn, Vec<AgentSighting>)>,
    entries: Vec<ClassificationEntry>,
    queue_counts: Vec<QueueCount>,
    aml_daily: Vec<AmlDailyStats>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<KpiQuery>>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer aggregate queries matching `matcher` with `rows`
    pub(crate) fn respond(
        mut self,
        matcher: impl Fn(&KpiQuery) -> bool + Send + Sync + 'static,
        rows: Vec<BucketRow>,
    ) -> Self {
        self.responses.push((Box::new(matcher), rows));
        self
    }

    pub(crate) fn with_agents(mut self, column: TimeColumn, sightings: Vec<AgentSighting>) -> Self {
        self.agents.push((column, sightings));
        self
    }

    pub(crate) fn with_entries(mut self, entries: Vec<ClassificationEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub(crate) fn with_queue_stats(
        mut self,
        counts: Vec<QueueCount>,
        aml_daily: Vec<AmlDailyStats>,
    ) -> Self {
        self.queue_counts = counts;
        self.aml_daily = aml_daily;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of store calls made so far
    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<KpiQuery> {
        self.queries.lock().unwrap().clone()
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(Error::Database("database is locked".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn aggregate(&self, query: &KpiQuery) -> Result<Vec<BucketRow>> {
        self.queries.lock().unwrap().push(query.clone());
        self.enter().await?;
        Ok(self
            .responses
            .iter()
            .find(|(matcher, _)| matcher(query))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn agent_sightings(&self, query: &AgentQuery) -> Result<Vec<AgentSighting>> {
        self.enter().await?;
        Ok(self
            .agents
            .iter()
            .filter(|(column, _)| *column == query.time_column)
            .flat_map(|(_, sightings)| sightings.clone())
            .collect())
    }

    async fn classifications(
        &self,
        filter: &ClassificationFilter,
    ) -> Result<Vec<ClassificationEntry>> {
        self.enter().await?;
        Ok(self
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }

    async fn queue_counts(&self, _range: &DateRange) -> Result<Vec<QueueCount>> {
        self.enter().await?;
        Ok(self.queue_counts.clone())
    }

    async fn queue_daily_breakdown(
        &self,
        _range: &DateRange,
        _queue: &str,
    ) -> Result<Vec<AmlDailyStats>> {
        self.enter().await?;
        Ok(self.aml_daily.clone())
    }

    async fn ping(&self) -> Result<()> {
        self.enter().await
    }
}
