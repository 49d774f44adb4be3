//! Common fixtures for integration tests

use ccdash_core::{QueueNormalizer, RecordStore};
use ccdash_engine::ReportService;
use ccdash_store_sqlite::{CallRecord, ChatRecord, Classifier, RequestRecord, SqliteRecordStore};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// A fresh database in a temporary directory
#[allow(dead_code)]
pub struct Fixture {
    _dir: TempDir,
    pub store: SqliteRecordStore,
}

#[allow(dead_code)]
impl Fixture {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = SqliteRecordStore::open(&dir.path().join("reports.db"), 2)
            .await
            .unwrap();
        Self { _dir: dir, store }
    }

    pub fn service(&self) -> ReportService {
        let store: Arc<dyn RecordStore> = Arc::new(self.store.clone());
        ReportService::new(store, QueueNormalizer::default())
    }
}

fn local(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// A call entering `queue` at `entered`, answered after `wait` seconds
#[allow(dead_code)]
pub fn answered_call(queue: &str, entered: &str, wait: f64, duration: f64, agent: &str) -> CallRecord {
    let enter = local(entered);
    CallRecord {
        queue_name: queue.to_string(),
        event_type: "in".to_string(),
        enter_queue_date: enter,
        answer_date: Some(enter + chrono::Duration::seconds(wait as i64)),
        call_duration: Some(duration),
        queue_wait_time: wait,
        user_id: Some(agent.to_string()),
    }
}

#[allow(dead_code)]
pub fn abandoned_call(queue: &str, entered: &str, wait: f64) -> CallRecord {
    CallRecord {
        queue_name: queue.to_string(),
        event_type: "abandon".to_string(),
        enter_queue_date: local(entered),
        answer_date: None,
        call_duration: None,
        queue_wait_time: wait,
        user_id: None,
    }
}

#[allow(dead_code)]
pub fn chat(assigned: &str, frt: f64, resolution: f64, agent: &str) -> ChatRecord {
    let assign = local(assigned);
    ChatRecord {
        event_type: "in".to_string(),
        created_date: assign - chrono::Duration::seconds(30),
        assign_date: Some(assign),
        chat_frt: Some(frt),
        resolution_time_total: Some(resolution),
        agent_frt: Some(frt),
        user_id: Some(agent.to_string()),
    }
}

/// A request document created at the given UTC instant
#[allow(dead_code)]
pub fn request(created_utc: &str, queue: &str, paths: &[&str]) -> RequestRecord {
    let created: DateTime<Utc> = format!("{}Z", created_utc).parse().unwrap();
    RequestRecord {
        created_date: created,
        queue_name: queue.to_string(),
        event_type: "in".to_string(),
        classifiers: paths
            .iter()
            .map(|p| Classifier {
                path: p.to_string(),
            })
            .collect(),
    }
}
