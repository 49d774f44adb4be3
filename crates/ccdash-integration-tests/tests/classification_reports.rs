//! Classification reports over request documents

mod common;

use ccdash_core::DateRange;
use ccdash_core::report::ClassifierRow;
use ccdash_engine::RequestContext;
use common::{Fixture, request};

fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
}

fn rows(report: &[ClassifierRow]) -> Vec<(String, String, String, u64)> {
    report
        .iter()
        .map(|r| {
            (
                r.report_date.to_string(),
                r.topic.clone(),
                r.subtopic.clone(),
                r.total,
            )
        })
        .collect()
}

fn row(date: &str, topic: &str, subtopic: &str, total: u64) -> (String, String, String, u64) {
    (date.to_string(), topic.to_string(), subtopic.to_string(), total)
}

/// Request documents around 2024-01-01 in the +04:00 reporting offset
async fn seeded() -> Fixture {
    let fixture = Fixture::new().await;
    fixture
        .store
        .insert_requests(&[
            request("2023-12-31T21:30:00", "m10", &["Root/Billing"]),
            request(
                "2024-01-01T06:00:00",
                "m10",
                &["Root/Billing", "Root/Billing", "Root/Cards/Blocked"],
            ),
            request("2024-01-01T07:00:00", "WHATSAPP", &["Root/Billing"]),
            request("2024-01-01T08:00:00", "telegram", &["Root / Billing "]),
            request("2024-01-01T09:00:00", "m10-shikayet", &["Root/Complaint/Rude agent"]),
            request("2024-01-01T20:30:00", "m10", &["Root/Late"]),
        ])
        .await
        .unwrap();
    fixture
}

#[tokio::test]
async fn test_call_and_chat_breakdowns() {
    let fixture = seeded().await;
    let service = fixture.service();
    let ctx = RequestContext::new();
    let day = range("2024-01-01", "2024-01-01");

    let calls = service.call_classifiers(&ctx, day, "m10").await.unwrap();
    assert_eq!(
        rows(&calls.data),
        [
            row("2024-01-01", "Billing", "", 3),
            row("2024-01-01", "Cards", "Blocked", 1),
        ]
    );

    let chats = service.chat_classifiers(&ctx, day, "m10").await.unwrap();
    assert_eq!(rows(&chats.data), [row("2024-01-01", "Billing", "", 2)]);

    let aml = service.call_classifiers(&ctx, day, "aml").await.unwrap();
    assert_eq!(
        rows(&aml.data),
        [row("2024-01-01", "Complaint", "Rude agent", 1)]
    );
}

#[tokio::test]
async fn test_overall_merges_channels() {
    let fixture = seeded().await;
    let overall = fixture
        .service()
        .overall_classifiers(&RequestContext::new(), range("2024-01-01", "2024-01-01"), "m10")
        .await
        .unwrap();

    assert_eq!(
        rows(&overall.data),
        [
            row("2024-01-01", "Billing", "", 5),
            row("2024-01-01", "Cards", "Blocked", 1),
        ]
    );
}

#[tokio::test]
async fn test_chat_aml_is_always_empty() {
    let fixture = seeded().await;
    let report = fixture
        .service()
        .chat_classifiers(&RequestContext::new(), range("2000-01-01", "2099-12-31"), "aml")
        .await
        .unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_topic_ratios_sum_to_hundred() {
    let fixture = seeded().await;
    let report = fixture
        .service()
        .topics(&RequestContext::new(), range("2024-01-01", "2024-01-02"), "all")
        .await
        .unwrap();

    let first_day: Vec<_> = report
        .data
        .iter()
        .filter(|r| r.report_date.to_string() == "2024-01-01")
        .collect();
    let topics: Vec<(&str, u64)> = first_day.iter().map(|r| (r.topic.as_str(), r.total)).collect();
    assert_eq!(topics, [("Billing", 5), ("Cards", 1), ("Complaint", 1)]);

    let sum: f64 = first_day.iter().map(|r| r.ratio).sum();
    assert!((sum - 100.0).abs() < 1e-6);
    assert!((first_day[0].ratio - 500.0 / 7.0).abs() < 1e-9);

    let second_day: Vec<_> = report
        .data
        .iter()
        .filter(|r| r.report_date.to_string() == "2024-01-02")
        .collect();
    assert_eq!(second_day.len(), 1);
    assert_eq!(second_day[0].topic, "Late");
    assert_eq!(second_day[0].ratio, 100.0);
}

#[tokio::test]
async fn test_available_topics_and_subtopics() {
    let fixture = seeded().await;
    let service = fixture.service();
    let ctx = RequestContext::new();
    let day = range("2024-01-01", "2024-01-01");

    let topics = service.available_topics(&ctx, day, "all").await.unwrap();
    let names: Vec<&str> = topics.data.iter().map(|t| t.topic.as_str()).collect();
    assert_eq!(names, ["Billing", "Cards", "Complaint"]);

    // the m10 topic set leaves the complaints queue out
    let m10 = service.available_topics(&ctx, day, "m10").await.unwrap();
    assert_eq!(m10.len(), 2);

    let subtopics = service.subtopics_daily(&ctx, day, "all", "Cards").await.unwrap();
    assert_eq!(rows(&subtopics.data), [row("2024-01-01", "Cards", "Blocked", 1)]);
}

#[tokio::test]
async fn test_reports_are_idempotent() {
    let fixture = seeded().await;
    let service = fixture.service();
    let ctx = RequestContext::new();
    let span = range("2023-12-31", "2024-01-02");

    let first = service.overall_classifiers(&ctx, span, "all").await.unwrap();
    let second = service.overall_classifiers(&ctx, span, "all").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let topics_a = service.topics(&ctx, span, "all").await.unwrap();
    let topics_b = service.topics(&ctx, span, "all").await.unwrap();
    assert_eq!(topics_a, topics_b);
}
