//! Queue selector normalization
//!
//! Reports are requested for a user-facing queue selector (`all`, `m10`,
//! `aml`, or any literal queue name). The stores know only raw queue
//! identifiers, and the literal sets differ per domain: KPI tables use
//! `m10-shikayet` for the AML queue, chat classifications have no AML queue
//! at all, and topic views span both channels.
//!
//! The literal sets live in a [`QueueTable`] loaded once from configuration;
//! [`QueueNormalizer`] is a pure lookup over it. Unknown selectors are never
//! an error: they pass through verbatim as a single-queue filter.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Channel;

/// Parsed form of a caller-supplied queue selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueueSelector {
    All,
    M10,
    Aml,
    Literal(String),
}

impl QueueSelector {
    /// `all` and `m10` match exactly; `aml` matches in any letter case.
    pub fn parse(selector: &str) -> Self {
        match selector {
            "all" => QueueSelector::All,
            "m10" => QueueSelector::M10,
            s if s.eq_ignore_ascii_case("aml") => QueueSelector::Aml,
            s => QueueSelector::Literal(s.to_string()),
        }
    }
}

/// Which store vocabulary the selector is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueDomain {
    /// Structured call KPI tables
    Kpi,
    /// Classification documents of a single channel
    Classification(Channel),
    /// Topic and subtopic views over both channels
    Topics,
}

/// Concrete queue literals for the three named selectors of one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSet {
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(default)]
    pub m10: Vec<String>,
    #[serde(default)]
    pub aml: Vec<String>,
}

impl QueueSet {
    fn new(all: &[&str], m10: &[&str], aml: &[&str]) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            all: owned(all),
            m10: owned(m10),
            aml: owned(aml),
        }
    }
}

const CALL_MAIN: &str = "m10";
const CALL_AML: &str = "m10-shikayet";
const CHAT_QUEUES: [&str; 4] = ["m10 Facebook", "WHATSAPP", "m10 Instagram", "telegram"];

/// Static mapping from (selector, domain) to queue literal sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTable {
    #[serde(default = "QueueTable::default_kpi")]
    pub kpi: QueueSet,
    #[serde(default = "QueueTable::default_call_classification")]
    pub call_classification: QueueSet,
    #[serde(default = "QueueTable::default_chat_classification")]
    pub chat_classification: QueueSet,
    #[serde(default = "QueueTable::default_topics")]
    pub topics: QueueSet,
}

impl QueueTable {
    fn default_kpi() -> QueueSet {
        QueueSet::new(&[CALL_MAIN, CALL_AML], &[CALL_MAIN], &[CALL_AML])
    }

    fn default_call_classification() -> QueueSet {
        QueueSet::new(&[CALL_MAIN], &[CALL_MAIN], &[CALL_AML])
    }

    fn default_chat_classification() -> QueueSet {
        QueueSet::new(&CHAT_QUEUES, &CHAT_QUEUES, &[])
    }

    fn default_topics() -> QueueSet {
        let mut all = vec![CALL_MAIN, CALL_AML];
        all.extend(CHAT_QUEUES);
        let mut m10 = vec![CALL_MAIN];
        m10.extend(CHAT_QUEUES);
        QueueSet::new(&all, &m10, &[CALL_AML])
    }

    pub fn set(&self, domain: QueueDomain) -> &QueueSet {
        match domain {
            QueueDomain::Kpi => &self.kpi,
            QueueDomain::Classification(Channel::Call) => &self.call_classification,
            QueueDomain::Classification(Channel::Chat) => &self.chat_classification,
            QueueDomain::Topics => &self.topics,
        }
    }
}

impl Default for QueueTable {
    fn default() -> Self {
        Self {
            kpi: Self::default_kpi(),
            call_classification: Self::default_call_classification(),
            chat_classification: Self::default_chat_classification(),
            topics: Self::default_topics(),
        }
    }
}

/// Set of raw queue identifiers a query is restricted to
///
/// An empty filter matches nothing; callers treat it as a defined empty
/// result and skip the store entirely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueFilter {
    queues: Vec<String>,
}

impl QueueFilter {
    pub fn new(queues: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            queues: queues.into_iter().map(Into::into).collect(),
        }
    }

    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn matches(&self, queue: &str) -> bool {
        self.queues.iter().any(|q| q == queue)
    }
}

impl fmt::Display for QueueFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.queues.join(", "))
    }
}

/// Resolves queue selectors against a [`QueueTable`]
#[derive(Debug, Clone, Default)]
pub struct QueueNormalizer {
    table: QueueTable,
}

impl QueueNormalizer {
    pub fn new(table: QueueTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &QueueTable {
        &self.table
    }

    /// Map a selector to the raw queue identifiers of `domain`
    ///
    /// # Examples
    /// ```
    /// use ccdash_core::queue::{QueueDomain, QueueNormalizer};
    ///
    /// let normalizer = QueueNormalizer::default();
    /// let filter = normalizer.normalize("all", QueueDomain::Kpi);
    /// assert!(filter.matches("m10"));
    /// assert!(filter.matches("m10-shikayet"));
    ///
    /// // Unknown selectors pass through unchanged
    /// assert_eq!(normalizer.normalize("xyz", QueueDomain::Kpi).queues(), ["xyz"]);
    /// ```
    pub fn normalize(&self, selector: &str, domain: QueueDomain) -> QueueFilter {
        let set = self.table.set(domain);
        match QueueSelector::parse(selector) {
            QueueSelector::All => QueueFilter::new(set.all.iter().cloned()),
            QueueSelector::M10 => QueueFilter::new(set.m10.iter().cloned()),
            QueueSelector::Aml => QueueFilter::new(set.aml.iter().cloned()),
            QueueSelector::Literal(queue) => QueueFilter::new([queue]),
        }
    }
}
