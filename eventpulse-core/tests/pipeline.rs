//! Integration tests for the eventpulse aggregation and insight pipeline
//!
//! These tests drive the full flow the trigger runtime would: persist a
//! document, dispatch its change event, and assert on the aggregates and
//! insight documents the pipeline leaves behind.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use eventpulse_core::analytics::InsightRunStatus;
use eventpulse_core::config::AnalyticsConfig;
use eventpulse_core::{
    AttendanceRecord, ChangeEvent, CommentRecord, CustomerRef, EventRecord, EventStore,
    FeedbackRecord, Sentiment, TriggerPipeline,
};

/// Build a pipeline over a fresh in-memory store.
fn test_pipeline() -> TriggerPipeline {
    let store = EventStore::open_in_memory().expect("open in-memory store");
    store.migrate().expect("run migrations");
    TriggerPipeline::new(store, AnalyticsConfig::default())
}

fn seed_event(pipeline: &TriggerPipeline, id: &str, host_uid: &str) {
    pipeline
        .store()
        .upsert_event(&EventRecord {
            id: id.to_string(),
            title: format!("Event {id}"),
            host_uid: host_uid.to_string(),
            starts_at: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
            location: Some("Main hall".to_string()),
        })
        .unwrap();
}

fn check_in_at(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 1, hour, 20, 0)
        .unwrap()
}

fn walk_in(pipeline: &TriggerPipeline, event_id: &str, hour: u32) {
    pipeline
        .record_attendance(&AttendanceRecord::new(
            event_id,
            CustomerRef::WithoutLogin,
            check_in_at(hour),
        ))
        .unwrap();
}

// ============================================
// Aggregation properties
// ============================================

#[test]
fn test_sequential_attendance_counts() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    for hour in [9, 9, 10, 14, 14, 14, 20] {
        walk_in(&pipeline, "evt-1", hour);
    }

    let analytics = pipeline.store().get_analytics("evt-1").unwrap().unwrap();
    assert_eq!(analytics.total_attendees, 7);

    // Bucket sums across all hours equal the attendee total
    let bucket_sum: i64 = analytics.hourly_sign_ins.values().sum();
    assert_eq!(bucket_sum, 7);
    assert_eq!(analytics.hourly_sign_ins.get("14:00"), Some(&3));
}

#[test]
fn test_repeat_attendees_cross_event_join() {
    let pipeline = test_pipeline();
    for id in ["evt-a", "evt-b", "evt-c", "evt-d"] {
        seed_event(&pipeline, id, "host-1");
    }

    // One loyal customer attended A, B, C before checking into D
    for id in ["evt-a", "evt-b", "evt-c"] {
        pipeline
            .record_attendance(&AttendanceRecord::new(
                id,
                CustomerRef::Uid("cust-loyal".into()),
                check_in_at(9),
            ))
            .unwrap();
    }
    pipeline
        .record_attendance(&AttendanceRecord::new(
            "evt-d",
            CustomerRef::Uid("cust-loyal".into()),
            check_in_at(9),
        ))
        .unwrap();

    let analytics = pipeline.store().get_analytics("evt-d").unwrap().unwrap();
    assert_eq!(analytics.repeat_attendees, 3);
}

#[test]
fn test_dropout_rate_from_pre_registrations() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    // 10 pre-registrations: placeholders aggregate nothing themselves
    for _ in 0..10 {
        pipeline
            .record_attendance(&AttendanceRecord::new(
                "evt-1",
                CustomerRef::PreRegistered,
                check_in_at(8),
            ))
            .unwrap();
    }
    assert!(pipeline.store().get_analytics("evt-1").unwrap().is_none());

    for _ in 0..6 {
        walk_in(&pipeline, "evt-1", 10);
    }
    let analytics = pipeline.store().get_analytics("evt-1").unwrap().unwrap();
    assert_eq!(analytics.dropout_rate, 40.0);

    for _ in 0..4 {
        walk_in(&pipeline, "evt-1", 10);
    }
    let analytics = pipeline.store().get_analytics("evt-1").unwrap().unwrap();
    assert_eq!(analytics.dropout_rate, 0.0);
}

#[test]
fn test_duplicate_delivery_double_counts() {
    // At-least-once delivery with a replayed record: aggregation does not
    // deduplicate, so the count goes up twice.
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    let record = AttendanceRecord::new("evt-1", CustomerRef::WithoutLogin, check_in_at(9));
    pipeline.store().insert_attendance(&record).unwrap();
    pipeline
        .handle(ChangeEvent::AttendanceCreated(record.clone()))
        .unwrap();
    pipeline
        .handle(ChangeEvent::AttendanceCreated(record))
        .unwrap();

    let analytics = pipeline.store().get_analytics("evt-1").unwrap().unwrap();
    assert_eq!(analytics.total_attendees, 2);
    assert_eq!(analytics.hourly_sign_ins.get("09:00"), Some(&2));
}

// ============================================
// Insight trigger threshold
// ============================================

#[test]
fn test_insights_appear_exactly_at_floor() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    for _ in 0..4 {
        walk_in(&pipeline, "evt-1", 9);
    }
    assert!(
        pipeline.store().get_insights("evt-1").unwrap().is_none(),
        "insights must not exist below the floor"
    );

    walk_in(&pipeline, "evt-1", 9);
    let insights = pipeline.store().get_insights("evt-1").unwrap();
    assert!(insights.is_some(), "fifth attendee crosses the floor");

    // Every further increment regenerates (no debouncing)
    walk_in(&pipeline, "evt-1", 14);
    let insights = pipeline.store().get_insights("evt-1").unwrap().unwrap();
    assert_eq!(insights.peak_hours.total_sign_ins, 6);

    let runs = pipeline
        .store()
        .insight_runs_for_event("evt-1", 10)
        .unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == InsightRunStatus::Success));
}

#[test]
fn test_feedback_never_triggers_insights() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    for rating in [5, 5, 4, 4, 5, 3] {
        pipeline
            .record_feedback(&FeedbackRecord::new("evt-1", rating, Some("nice"), false))
            .unwrap();
    }

    // The analytics row exists with a feedback block, but the attendee count
    // never grew, so no insight document was generated.
    let analytics = pipeline.store().get_analytics("evt-1").unwrap().unwrap();
    assert_eq!(analytics.total_attendees, 0);
    assert_eq!(analytics.feedback.unwrap().total_ratings, 6);
    assert!(pipeline.store().get_insights("evt-1").unwrap().is_none());
}

// ============================================
// Insight document contents
// ============================================

#[test]
fn test_generated_document_sections() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    // 5 morning + 3 afternoon check-ins
    for _ in 0..5 {
        walk_in(&pipeline, "evt-1", 9);
    }
    for _ in 0..3 {
        walk_in(&pipeline, "evt-1", 14);
    }

    for text in ["This event was great and amazing", "great talk", "loved it"] {
        pipeline
            .store()
            .insert_comment(&CommentRecord::new("evt-1", Some("cust-1"), text, Utc::now()))
            .unwrap();
    }

    // Re-trigger generation with one more check-in
    walk_in(&pipeline, "evt-1", 14);

    let insights = pipeline.store().get_insights("evt-1").unwrap().unwrap();

    // Peak hours: 5 of 9 sign-ins at 09:00
    assert_eq!(insights.peak_hours.peak_hour.as_deref(), Some("09:00"));
    assert_eq!(insights.peak_hours.peak_count, 5);
    assert!((insights.peak_hours.confidence - 5.0 / 9.0).abs() < 1e-9);
    assert!(insights
        .peak_hours
        .recommendation
        .starts_with("Morning events"));

    // Sentiment: all three comments positive
    assert_eq!(insights.sentiment.overall, Sentiment::Positive);
    assert_eq!(insights.sentiment.positive_count, 3);
    assert_eq!(insights.sentiment.confidence, 0.8);

    // Optimizations: morning timing + weekend rules fire
    let titles: Vec<&str> = insights
        .optimization_predictions
        .iter()
        .map(|o| o.title.as_str())
        .collect();
    assert!(titles.contains(&"Optimize Event Timing"));
    assert!(titles.contains(&"Weekend Events"));

    // Dropout: no pre-registrations, rate 0, low severity
    assert_eq!(insights.dropout.dropout_rate, 0.0);

    // Repeat attendees: no signed-in customers, rate 0
    assert_eq!(insights.repeat_attendees.repeat_rate, 0.0);
}

// ============================================
// Scheduled tick
// ============================================

#[test]
fn test_tick_refreshes_stale_insights() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    for _ in 0..5 {
        walk_in(&pipeline, "evt-1", 9);
    }
    assert!(pipeline.store().get_insights("evt-1").unwrap().is_some());

    // A comment alone never re-triggers the edge check...
    pipeline
        .store()
        .insert_comment(&CommentRecord::new(
            "evt-1",
            None,
            "terrible and boring",
            Utc::now(),
        ))
        .unwrap();
    let stale = pipeline.store().get_insights("evt-1").unwrap().unwrap();
    assert_eq!(stale.sentiment.total_comments, 0);

    // ...but the scheduled tick regenerates everything above the floor.
    pipeline
        .handle(ChangeEvent::Tick {
            fired_at: Utc::now(),
        })
        .unwrap();
    let fresh = pipeline.store().get_insights("evt-1").unwrap().unwrap();
    assert_eq!(fresh.sentiment.negative_count, 1);
}

#[test]
fn test_tick_ignores_events_below_floor() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");

    for _ in 0..3 {
        walk_in(&pipeline, "evt-1", 9);
    }
    pipeline
        .handle(ChangeEvent::Tick {
            fired_at: Utc::now(),
        })
        .unwrap();
    assert!(pipeline.store().get_insights("evt-1").unwrap().is_none());
}

// ============================================
// On-disk store
// ============================================

#[test]
fn test_pipeline_on_disk_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eventpulse.db");

    let store = EventStore::open(&path).unwrap();
    store.migrate().unwrap();
    let pipeline = TriggerPipeline::new(store, AnalyticsConfig::default());
    seed_event(&pipeline, "evt-1", "host-1");

    for _ in 0..5 {
        walk_in(&pipeline, "evt-1", 11);
    }

    drop(pipeline);

    // Reopen and verify both layers survived
    let store = EventStore::open(&path).unwrap();
    store.migrate().unwrap();
    let analytics = store.get_analytics("evt-1").unwrap().unwrap();
    assert_eq!(analytics.total_attendees, 5);
    assert!(store.get_insights("evt-1").unwrap().is_some());
}

// ============================================
// Purge
// ============================================

#[test]
fn test_purge_event_data_end_to_end() {
    let pipeline = test_pipeline();
    seed_event(&pipeline, "evt-1", "host-1");
    seed_event(&pipeline, "evt-2", "host-1");

    for _ in 0..5 {
        walk_in(&pipeline, "evt-1", 9);
        walk_in(&pipeline, "evt-2", 9);
    }
    pipeline
        .record_feedback(&FeedbackRecord::new("evt-1", 4, Some("fine"), true))
        .unwrap();

    let summary = pipeline.store().purge_event_data("evt-1").unwrap();
    assert_eq!(summary.attendance, 5);
    assert_eq!(summary.feedback, 1);
    assert_eq!(summary.analytics, 1);
    assert_eq!(summary.insights, 1);
    assert!(summary.insight_runs >= 1);

    assert!(pipeline.store().get_analytics("evt-1").unwrap().is_none());
    assert!(pipeline.store().get_insights("evt-1").unwrap().is_none());

    // The sibling event is untouched
    let other = pipeline.store().get_analytics("evt-2").unwrap().unwrap();
    assert_eq!(other.total_attendees, 5);
}
