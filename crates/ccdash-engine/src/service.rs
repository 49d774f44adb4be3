//! Report facade
//!
//! `ReportService` is the single entry point for callers: it resolves the
//! queue selector for the report's domain, runs the matching aggregator and
//! wraps the rows in a tagged [`Report`]. Each call is timed and reported to
//! the configured observer.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ccdash_core::kpi::DEFAULT_SL_THRESHOLD_SECS;
use ccdash_core::report::{
    ClassifierRow, DailyRow, HourlyRow, MonthlyRow, QueueStats, Report, ReportKind, StoreStatus,
    TopicName, TopicRow,
};
use ccdash_core::{
    Channel, DateRange, Error, Granularity, NoopObserver, QueueDomain, QueueFilter,
    QueueNormalizer, RecordStore, ReportObserver, Result,
};
use tracing::{info, warn};

use crate::classification::{ClassificationAggregator, ClassificationMode, ClassificationRows};
use crate::context::{RequestContext, observed_step};
use crate::kpi::{HourlyMetric, KpiAggregator};

pub struct ReportService {
    store: Option<Arc<dyn RecordStore>>,
    normalizer: QueueNormalizer,
    observer: Arc<dyn ReportObserver>,
    sl_threshold_secs: i64,
    query_timeout: Option<Duration>,
}

impl ReportService {
    pub fn new(store: Arc<dyn RecordStore>, normalizer: QueueNormalizer) -> Self {
        Self {
            store: Some(store),
            ..Self::disconnected(normalizer)
        }
    }

    /// A service with no store handle; every report fails with
    /// `Error::Unavailable`
    pub fn disconnected(normalizer: QueueNormalizer) -> Self {
        Self {
            store: None,
            normalizer,
            observer: Arc::new(NoopObserver),
            sl_threshold_secs: DEFAULT_SL_THRESHOLD_SECS,
            query_timeout: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReportObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_sl_threshold(mut self, threshold_secs: i64) -> Self {
        self.sl_threshold_secs = threshold_secs;
        self
    }

    /// Default per-step timeout for contexts that do not set their own
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn normalizer(&self) -> &QueueNormalizer {
        &self.normalizer
    }

    pub async fn daily(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<DailyRow>> {
        self.observe(ReportKind::Daily, range, queue, async {
            let queues = self.normalizer.normalize(queue, QueueDomain::Kpi);
            self.kpi()?
                .aggregate(&self.context(ctx), range, &queues, Granularity::Daily, None)
                .await?
                .into_daily()
        })
        .await
    }

    pub async fn monthly(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<MonthlyRow>> {
        self.observe(ReportKind::Monthly, range, queue, async {
            let queues = self.normalizer.normalize(queue, QueueDomain::Kpi);
            self.kpi()?
                .aggregate(&self.context(ctx), range, &queues, Granularity::Monthly, None)
                .await?
                .into_monthly()
        })
        .await
    }

    /// # Errors
    /// - `Error::InvalidMetric` if `metric` is unknown; no query is issued
    pub async fn hourly(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
        metric: &str,
    ) -> Result<Report<HourlyRow>> {
        self.observe(ReportKind::Hourly, range, queue, async {
            let metric: HourlyMetric = metric.parse()?;
            let queues = self.normalizer.normalize(queue, QueueDomain::Kpi);
            self.kpi()?
                .aggregate(
                    &self.context(ctx),
                    range,
                    &queues,
                    Granularity::Hourly,
                    Some(metric.as_str()),
                )
                .await?
                .into_hourly()
        })
        .await
    }

    pub async fn call_classifiers(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<ClassifierRow>> {
        self.observe(ReportKind::CallClassifiers, range, queue, async {
            let queues = self
                .normalizer
                .normalize(queue, QueueDomain::Classification(Channel::Call));
            self.classify(ctx, range, &queues, ClassificationMode::Full(Channel::Call))
                .await?
                .into_classifiers()
        })
        .await
    }

    /// Always empty for the AML selector
    pub async fn chat_classifiers(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<ClassifierRow>> {
        self.observe(ReportKind::ChatClassifiers, range, queue, async {
            let queues = self
                .normalizer
                .normalize(queue, QueueDomain::Classification(Channel::Chat));
            self.classify(ctx, range, &queues, ClassificationMode::Full(Channel::Chat))
                .await?
                .into_classifiers()
        })
        .await
    }

    /// Call and chat breakdowns merged by (date, topic, subtopic)
    pub async fn overall_classifiers(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<ClassifierRow>> {
        self.observe(ReportKind::OverallClassifiers, range, queue, async {
            let call_queues = self
                .normalizer
                .normalize(queue, QueueDomain::Classification(Channel::Call));
            let chat_queues = self
                .normalizer
                .normalize(queue, QueueDomain::Classification(Channel::Chat));
            self.classify(
                ctx,
                range,
                &call_queues,
                ClassificationMode::Combined { chat_queues },
            )
            .await?
            .into_classifiers()
        })
        .await
    }

    pub async fn topics(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<TopicRow>> {
        self.observe(ReportKind::Topics, range, queue, async {
            let queues = self.normalizer.normalize(queue, QueueDomain::Topics);
            self.classify(ctx, range, &queues, ClassificationMode::Topics)
                .await?
                .into_topics()
        })
        .await
    }

    pub async fn available_topics(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
    ) -> Result<Report<TopicName>> {
        self.observe(ReportKind::AvailableTopics, range, queue, async {
            let queues = self.normalizer.normalize(queue, QueueDomain::Topics);
            self.classify(ctx, range, &queues, ClassificationMode::AvailableTopics)
                .await?
                .into_topic_names()
        })
        .await
    }

    pub async fn subtopics_daily(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queue: &str,
        topic: &str,
    ) -> Result<Report<ClassifierRow>> {
        self.observe(ReportKind::SubtopicsDaily, range, queue, async {
            let queues = self.normalizer.normalize(queue, QueueDomain::Topics);
            let mode = ClassificationMode::SubtopicsForTopic(topic.to_string());
            self.classify(ctx, range, &queues, mode)
                .await?
                .into_classifiers()
        })
        .await
    }

    /// Queue identifiers with counts, plus a per-date breakdown of the AML
    /// queue
    pub async fn queue_stats(
        &self,
        ctx: &RequestContext,
        range: DateRange,
    ) -> Result<Report<QueueStats>> {
        self.observe(ReportKind::QueueStats, range, "all", async {
            let store = self.store()?;
            let ctx = self.context(ctx);
            let observer = self.observer.as_ref();

            let mut queues =
                observed_step(observer, &ctx, "queue_counts", store.queue_counts(&range)).await?;
            queues.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.queue_name.cmp(&b.queue_name))
            });

            let mut aml_by_date = Vec::new();
            let aml = self.normalizer.normalize("aml", QueueDomain::Kpi);
            for queue in aml.queues() {
                let rows = observed_step(
                    observer,
                    &ctx,
                    "aml_daily",
                    store.queue_daily_breakdown(&range, queue),
                )
                .await?;
                aml_by_date.extend(rows);
            }
            aml_by_date.sort_by_key(|row| row.date);

            Ok(vec![QueueStats {
                queues,
                aml_by_date,
            }])
        })
        .await
    }

    /// Probe the store; never fails
    pub async fn store_status(&self, ctx: &RequestContext) -> StoreStatus {
        let Some(store) = &self.store else {
            return StoreStatus {
                available: false,
                detail: Some("record store not connected".to_string()),
            };
        };
        match self.context(ctx).run_step("ping", store.ping()).await {
            Ok(()) => StoreStatus {
                available: true,
                detail: None,
            },
            Err(e) => StoreStatus {
                available: false,
                detail: Some(e.to_string()),
            },
        }
    }

    fn context(&self, ctx: &RequestContext) -> RequestContext {
        ctx.clone().or_timeout(self.query_timeout)
    }

    fn store(&self) -> Result<&Arc<dyn RecordStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::Unavailable("record store not connected".to_string()))
    }

    fn kpi(&self) -> Result<KpiAggregator> {
        Ok(
            KpiAggregator::new(self.store()?.clone(), self.observer.clone())
                .with_sl_threshold(self.sl_threshold_secs),
        )
    }

    async fn classify(
        &self,
        ctx: &RequestContext,
        range: DateRange,
        queues: &QueueFilter,
        mode: ClassificationMode,
    ) -> Result<ClassificationRows> {
        ClassificationAggregator::new(self.store()?.clone(), self.observer.clone())
            .aggregate(&self.context(ctx), range, queues, &mode)
            .await
    }

    async fn observe<T, F>(
        &self,
        kind: ReportKind,
        range: DateRange,
        queue: &str,
        fut: F,
    ) -> Result<Report<T>>
    where
        F: Future<Output = Result<Vec<T>>>,
    {
        let started = Instant::now();
        info!(report = %kind, range = %range, queue, "Running report");

        match fut.await {
            Ok(rows) => {
                let elapsed = started.elapsed();
                info!(
                    report = %kind,
                    rows = rows.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Report complete"
                );
                self.observer.report_completed(kind, elapsed);
                Ok(Report::new(kind, rows))
            }
            Err(e) => {
                let elapsed = started.elapsed();
                warn!(report = %kind, error = %e, "Report failed");
                self.observer.report_failed(kind, e.kind(), elapsed);
                Err(e)
            }
        }
    }
}
