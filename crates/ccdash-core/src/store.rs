//! Record store trait
//!
//! The `RecordStore` trait is the read-only boundary between the reporting
//! engine and wherever call, chat and classification records live. Adapters
//! translate the typed query model into their native query language.

use async_trait::async_trait;

use crate::kpi::{AgentQuery, AgentSighting, BucketRow, KpiQuery};
use crate::pipeline::{ClassificationEntry, ClassificationFilter};
use crate::report::{AmlDailyStats, QueueCount};
use crate::types::DateRange;
use crate::Result;

/// Record store trait
///
/// Implementations:
/// - `SqliteRecordStore`: SQLite tables for calls, chats and classification documents
///
/// Records that cannot be decoded into the expected shape are skipped by the
/// implementation and never surface as errors.
///
/// # Example
/// ```no_run
/// # use ccdash_core::store::RecordStore;
/// # use ccdash_core::kpi::{KpiQuery, TimeColumn};
/// # use ccdash_core::types::{DateRange, EventType};
/// # async fn example(store: &dyn RecordStore) -> ccdash_core::Result<()> {
/// let range = DateRange::parse("2024-03-01", "2024-03-31")?;
/// let query = KpiQuery::new(TimeColumn::EnterQueue, range).with_types([EventType::In]);
/// for bucket in store.aggregate(&query).await? {
///     println!("{:?} {:?}", bucket.key, bucket.value);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run one range+filter+group aggregation
    ///
    /// Buckets with no matching rows are absent from the result.
    ///
    /// # Errors
    /// - `Error::Unavailable` if the store handle is gone
    /// - `Error::Database` for query errors
    async fn aggregate(&self, query: &KpiQuery) -> Result<Vec<BucketRow>>;

    /// Distinct (bucket, agent) pairs of agent activity
    ///
    /// # Errors
    /// - `Error::Unavailable` if the store handle is gone
    /// - `Error::Database` for query errors
    async fn agent_sightings(&self, query: &AgentQuery) -> Result<Vec<AgentSighting>>;

    /// Unwound classification entries matching the filter
    ///
    /// One entry per classifier of each matching event, with the report date
    /// already shifted into the reporting offset.
    async fn classifications(
        &self,
        filter: &ClassificationFilter,
    ) -> Result<Vec<ClassificationEntry>>;

    /// Distinct call queue identifiers in the range with row counts
    async fn queue_counts(&self, range: &DateRange) -> Result<Vec<QueueCount>>;

    /// Per-date total, incoming and abandoned call counts for one queue
    async fn queue_daily_breakdown(
        &self,
        range: &DateRange,
        queue: &str,
    ) -> Result<Vec<AmlDailyStats>>;

    /// Check that the store handle answers
    async fn ping(&self) -> Result<()>;
}
