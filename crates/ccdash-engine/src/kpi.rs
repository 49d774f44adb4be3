//! KPI aggregation over call and chat events
//!
//! Daily and monthly reports are eight independent series (call volume, AHT,
//! SL, abandonment, chat volume, FRT, resolution time, distinct agents)
//! fetched concurrently and merged by bucket key. Hourly reports fetch a
//! single series bucketed by (date, hour).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ccdash_core::kpi::{
    AgentQuery, AgentSighting, BucketKey, BucketRow, Bucketing, DEFAULT_SL_THRESHOLD_SECS,
    DurationField, KpiQuery, Measure, TimeColumn,
};
use ccdash_core::report::{DailyRow, HourlyRow, KpiSummary, MonthlyRow, format_duration, round2};
use ccdash_core::{
    DateRange, Error, EventType, Granularity, QueueFilter, RecordStore, ReportObserver, Result,
};
use tracing::debug;

use crate::context::{RequestContext, observed_step};

/// Metric selectable for an hourly report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HourlyMetric {
    Calls,
    Aht,
    Sl,
    Abandoned,
    Chats,
    Frt,
    Rt,
    Agents,
    Total,
}

impl HourlyMetric {
    pub const ALL: [HourlyMetric; 9] = [
        HourlyMetric::Calls,
        HourlyMetric::Aht,
        HourlyMetric::Sl,
        HourlyMetric::Abandoned,
        HourlyMetric::Chats,
        HourlyMetric::Frt,
        HourlyMetric::Rt,
        HourlyMetric::Agents,
        HourlyMetric::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HourlyMetric::Calls => "calls",
            HourlyMetric::Aht => "aht",
            HourlyMetric::Sl => "sl",
            HourlyMetric::Abandoned => "abandoned",
            HourlyMetric::Chats => "chats",
            HourlyMetric::Frt => "frt",
            HourlyMetric::Rt => "rt",
            HourlyMetric::Agents => "agents",
            HourlyMetric::Total => "total",
        }
    }
}

impl FromStr for HourlyMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HourlyMetric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| Error::InvalidMetric(s.to_string()))
    }
}

impl fmt::Display for HourlyMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows of one KPI report
#[derive(Debug, Clone, PartialEq)]
pub enum KpiRows {
    Daily(Vec<DailyRow>),
    Monthly(Vec<MonthlyRow>),
    Hourly(Vec<HourlyRow>),
}

impl KpiRows {
    pub fn len(&self) -> usize {
        match self {
            KpiRows::Daily(rows) => rows.len(),
            KpiRows::Monthly(rows) => rows.len(),
            KpiRows::Hourly(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            KpiRows::Daily(_) => Granularity::Daily,
            KpiRows::Monthly(_) => Granularity::Monthly,
            KpiRows::Hourly(_) => Granularity::Hourly,
        }
    }

    pub fn into_daily(self) -> Result<Vec<DailyRow>> {
        match self {
            KpiRows::Daily(rows) => Ok(rows),
            other => Err(other.mismatch(Granularity::Daily)),
        }
    }

    pub fn into_monthly(self) -> Result<Vec<MonthlyRow>> {
        match self {
            KpiRows::Monthly(rows) => Ok(rows),
            other => Err(other.mismatch(Granularity::Monthly)),
        }
    }

    pub fn into_hourly(self) -> Result<Vec<HourlyRow>> {
        match self {
            KpiRows::Hourly(rows) => Ok(rows),
            other => Err(other.mismatch(Granularity::Hourly)),
        }
    }

    fn mismatch(&self, wanted: Granularity) -> Error {
        Error::InvalidRequest(format!(
            "expected {:?} rows, got {:?}",
            wanted,
            self.granularity()
        ))
    }
}

const STEP_CALLS: &str = "calls";
const STEP_AHT: &str = "aht";
const STEP_SL: &str = "sl";
const STEP_ABANDONED: &str = "abandoned";
const STEP_CHATS: &str = "chats";
const STEP_FRT: &str = "frt";
const STEP_RT: &str = "rt";
const STEP_AGENTS: &str = "agents";

pub struct KpiAggregator {
    store: Arc<dyn RecordStore>,
    observer: Arc<dyn ReportObserver>,
    sl_threshold_secs: i64,
}

impl KpiAggregator {
    pub fn new(store: Arc<dyn RecordStore>, observer: Arc<dyn ReportObserver>) -> Self {
        Self {
            store,
            observer,
            sl_threshold_secs: DEFAULT_SL_THRESHOLD_SECS,
        }
    }

    pub fn with_sl_threshold(mut self, threshold_secs: i64) -> Self {
        self.sl_threshold_secs = threshold_secs;
        self
    }

    /// Aggregate at any granularity
    ///
    /// `metric` is required for hourly reports and ignored otherwise; a
    /// missing metric is rejected like an unknown one.
    ///
    /// # Errors
    /// - `Error::InvalidMetric` for an unknown hourly metric, before any query
    /// - any error of the underlying steps
    pub async fn aggregate(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        granularity: Granularity,
        metric: Option<&str>,
    ) -> Result<KpiRows> {
        match granularity {
            Granularity::Daily => Ok(KpiRows::Daily(self.daily(ctx, range, queues).await?)),
            Granularity::Monthly => Ok(KpiRows::Monthly(self.monthly(ctx, range, queues).await?)),
            Granularity::Hourly => {
                let metric: HourlyMetric = metric
                    .ok_or_else(|| Error::InvalidMetric(String::new()))?
                    .parse()?;
                Ok(KpiRows::Hourly(
                    self.hourly(ctx, range, queues, metric).await?,
                ))
            }
        }
    }

    /// One row per calendar date
    async fn daily(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
    ) -> Result<Vec<DailyRow>> {
        let summaries = self.summaries(ctx, range, queues, Bucketing::Date).await?;
        Ok(summaries
            .into_iter()
            .filter_map(|(key, summary)| match key {
                BucketKey::Date { date } => Some(DailyRow { date, summary }),
                _ => None,
            })
            .collect())
    }

    /// One row per day-of-month
    ///
    /// Equal day numbers from different months land in the same row.
    async fn monthly(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
    ) -> Result<Vec<MonthlyRow>> {
        let summaries = self
            .summaries(ctx, range, queues, Bucketing::DayOfMonth)
            .await?;
        Ok(summaries
            .into_iter()
            .filter_map(|(key, summary)| match key {
                BucketKey::DayOfMonth { day } => Some(MonthlyRow { day, summary }),
                _ => None,
            })
            .collect())
    }

    /// One row per calendar date with a value for each hour
    ///
    /// Hours without qualifying rows are zero for every metric.
    async fn hourly(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        metric: HourlyMetric,
    ) -> Result<Vec<HourlyRow>> {
        let bucketing = Bucketing::hourly();
        let mut rows = BTreeMap::new();

        match metric {
            HourlyMetric::Calls => {
                let query = self
                    .call_query(range, queues, bucketing)
                    .with_types([EventType::In]);
                let buckets = self.buckets(ctx, STEP_CALLS, &query).await?;
                add_hours(&mut rows, buckets, count_value);
            }
            HourlyMetric::Aht => {
                let query = KpiQuery::new(TimeColumn::Answer, range)
                    .with_types([EventType::In])
                    .with_queues(queues.clone())
                    .with_bucketing(bucketing)
                    .with_measure(Measure::Average {
                        field: DurationField::CallDuration,
                    });
                let buckets = self.buckets(ctx, STEP_AHT, &query).await?;
                add_hours(&mut rows, buckets, rounded_seconds);
            }
            HourlyMetric::Sl => {
                let query = self.sl_query(range, queues, bucketing);
                let buckets = self.buckets(ctx, STEP_SL, &query).await?;
                add_hours(&mut rows, buckets, percentage);
            }
            HourlyMetric::Abandoned => {
                let query = self
                    .call_query(range, queues, bucketing)
                    .with_types([EventType::Abandon]);
                let buckets = self.buckets(ctx, STEP_ABANDONED, &query).await?;
                add_hours(&mut rows, buckets, count_value);
            }
            HourlyMetric::Chats => {
                let query = chat_volume_query(range, bucketing);
                let buckets = self.buckets(ctx, STEP_CHATS, &query).await?;
                add_hours(&mut rows, buckets, count_value);
            }
            HourlyMetric::Frt => {
                let query = chat_average_query(range, bucketing, DurationField::ChatFrt);
                let buckets = self.buckets(ctx, STEP_FRT, &query).await?;
                add_hours(&mut rows, buckets, rounded_seconds);
            }
            HourlyMetric::Rt => {
                let query = chat_average_query(range, bucketing, DurationField::ResolutionTime);
                let buckets = self.buckets(ctx, STEP_RT, &query).await?;
                add_hours(&mut rows, buckets, rounded_seconds);
            }
            HourlyMetric::Agents => {
                let agents = self.distinct_agents(ctx, range, queues, bucketing).await?;
                add_hours(
                    &mut rows,
                    agents
                        .into_iter()
                        .map(|(key, n)| BucketRow::new(key, Some(n as f64))),
                    count_value,
                );
            }
            HourlyMetric::Total => {
                let calls = self
                    .call_query(range, queues, bucketing)
                    .with_types([EventType::In]);
                let chats = chat_volume_query(range, bucketing);
                let (call_buckets, chat_buckets) = futures::try_join!(
                    self.buckets(ctx, STEP_CALLS, &calls),
                    self.buckets(ctx, STEP_CHATS, &chats),
                )?;
                add_hours(&mut rows, call_buckets, count_value);
                add_hours(&mut rows, chat_buckets, count_value);
            }
        }

        debug!(metric = %metric, dates = rows.len(), "hourly report assembled");
        Ok(rows.into_values().collect())
    }

    async fn summaries(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        bucketing: Bucketing,
    ) -> Result<BTreeMap<BucketKey, KpiSummary>> {
        let calls_q = self
            .call_query(range, queues, bucketing)
            .with_types([EventType::In, EventType::Abandon]);
        let aht_q = self
            .call_query(range, queues, bucketing)
            .with_types([EventType::In])
            .with_measure(Measure::Average {
                field: DurationField::CallDuration,
            });
        let sl_q = self.sl_query(range, queues, bucketing);
        let abandoned_q = self
            .call_query(range, queues, bucketing)
            .with_types([EventType::Abandon]);
        let chats_q = KpiQuery::new(TimeColumn::Assign, range)
            .with_types([EventType::In])
            .with_bucketing(bucketing);
        let frt_q = chats_q.clone().with_measure(Measure::Average {
            field: DurationField::ChatFrt,
        });
        let rt_q = chats_q.clone().with_measure(Measure::Average {
            field: DurationField::ResolutionTime,
        });

        let (calls, aht, sl, abandoned, chats, frt, rt, agents) = futures::try_join!(
            self.buckets(ctx, STEP_CALLS, &calls_q),
            self.buckets(ctx, STEP_AHT, &aht_q),
            self.buckets(ctx, STEP_SL, &sl_q),
            self.buckets(ctx, STEP_ABANDONED, &abandoned_q),
            self.buckets(ctx, STEP_CHATS, &chats_q),
            self.buckets(ctx, STEP_FRT, &frt_q),
            self.buckets(ctx, STEP_RT, &rt_q),
            self.distinct_agents(ctx, range, queues, bucketing),
        )?;

        let mut summaries: BTreeMap<BucketKey, KpiSummary> = BTreeMap::new();
        fold(&mut summaries, calls, |s, v| s.total_calls = count(v));
        fold(&mut summaries, aht, |s, v| s.aht = v.map(format_duration));
        fold(&mut summaries, sl, |s, v| s.sl = v.map(round2));
        fold(&mut summaries, abandoned, |s, v| s.total_abandoned = count(v));
        fold(&mut summaries, chats, |s, v| s.total_chats = count(v));
        fold(&mut summaries, frt, |s, v| s.avg_chat_frt = v.map(format_duration));
        fold(&mut summaries, rt, |s, v| {
            s.resolution_time_avg = v.map(format_duration)
        });
        for (key, n) in agents {
            summaries.entry(key).or_default().distinct_agents = n;
        }

        debug!(buckets = summaries.len(), "kpi summary assembled");
        Ok(summaries)
    }

    /// Distinct agents per bucket across both channels
    ///
    /// An agent seen on calls and chats in the same bucket counts once.
    async fn distinct_agents(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        bucketing: Bucketing,
    ) -> Result<BTreeMap<BucketKey, u64>> {
        let calls = AgentQuery::new(TimeColumn::Answer, range, bucketing)
            .with_types([EventType::In])
            .with_queues(queues.clone());
        let chats = AgentQuery::new(TimeColumn::Assign, range, bucketing).responded_only();

        let (call_agents, chat_agents) = futures::try_join!(
            self.sightings(ctx, &calls),
            self.sightings(ctx, &chats),
        )?;
        Ok(count_distinct(call_agents.into_iter().chain(chat_agents)))
    }

    async fn buckets(
        &self,
        ctx: &RequestContext,
        step: &str,
        query: &KpiQuery,
    ) -> Result<Vec<BucketRow>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let rows =
            observed_step(self.observer.as_ref(), ctx, step, self.store.aggregate(query)).await?;
        debug!(step, rows = rows.len(), "aggregate step finished");
        Ok(rows)
    }

    async fn sightings(
        &self,
        ctx: &RequestContext,
        query: &AgentQuery,
    ) -> Result<Vec<AgentSighting>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let rows = observed_step(
            self.observer.as_ref(),
            ctx,
            STEP_AGENTS,
            self.store.agent_sightings(query),
        )
        .await?;
        debug!(source = ?query.source(), rows = rows.len(), "agent step finished");
        Ok(rows)
    }

    fn call_query(&self, range: DateRange, queues: &QueueFilter, bucketing: Bucketing) -> KpiQuery {
        KpiQuery::new(TimeColumn::EnterQueue, range)
            .with_queues(queues.clone())
            .with_bucketing(bucketing)
    }

    fn sl_query(&self, range: DateRange, queues: &QueueFilter, bucketing: Bucketing) -> KpiQuery {
        self.call_query(range, queues, bucketing)
            .with_types([EventType::In])
            .with_measure(Measure::ServiceLevel {
                threshold_secs: self.sl_threshold_secs,
            })
    }
}

fn chat_volume_query(range: DateRange, bucketing: Bucketing) -> KpiQuery {
    KpiQuery::new(TimeColumn::Created, range)
        .with_types([EventType::In])
        .with_bucketing(bucketing)
}

fn chat_average_query(range: DateRange, bucketing: Bucketing, field: DurationField) -> KpiQuery {
    KpiQuery::new(TimeColumn::Assign, range)
        .with_types([EventType::In])
        .with_bucketing(bucketing)
        .with_measure(Measure::Average { field })
}

fn count(value: Option<f64>) -> u64 {
    value.map(|v| v.round() as u64).unwrap_or(0)
}

fn count_value(value: Option<f64>) -> f64 {
    value.map(f64::round).unwrap_or(0.0)
}

fn rounded_seconds(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).map(f64::round).unwrap_or(0.0)
}

fn percentage(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).map(round2).unwrap_or(0.0)
}

fn fold(
    summaries: &mut BTreeMap<BucketKey, KpiSummary>,
    rows: Vec<BucketRow>,
    apply: impl Fn(&mut KpiSummary, Option<f64>),
) {
    for row in rows {
        apply(summaries.entry(row.key).or_default(), row.value);
    }
}

fn add_hours(
    rows: &mut BTreeMap<chrono::NaiveDate, HourlyRow>,
    buckets: impl IntoIterator<Item = BucketRow>,
    value: fn(Option<f64>) -> f64,
) {
    for bucket in buckets {
        if let BucketKey::DateHour { date, hour } = bucket.key {
            rows.entry(date)
                .or_insert_with(|| HourlyRow::zeroed(date))
                .add(hour as usize, value(bucket.value));
        }
    }
}

fn count_distinct(sightings: impl IntoIterator<Item = AgentSighting>) -> BTreeMap<BucketKey, u64> {
    let unique: HashSet<AgentSighting> = sightings.into_iter().collect();
    let mut counts = BTreeMap::new();
    for sighting in unique {
        *counts.entry(sighting.key).or_default() += 1;
    }
    counts
}
