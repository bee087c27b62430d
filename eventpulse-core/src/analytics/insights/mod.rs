//! Insight generation
//!
//! Produces one `ai_insights` document per event by running five independent
//! analyses over the current aggregates, comments, and attendance:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     INSIGHT GENERATOR                        │
//! │                                                              │
//! │  event_analytics ──► peak hours ─┐                           │
//! │  comments ────────► sentiment ───┤                           │
//! │                     optimizations├──► AiInsights ──► store   │
//! │  event_analytics ──► dropout ────┤    (wholesale             │
//! │  event_analytics ──► repeat ─────┘     overwrite)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Insights are a derived cache: they are recomputed wholesale, never merged,
//! and concurrent generators for the same event settle by last-writer-wins.
//! Every attempt is recorded in `insight_runs` for observability.

pub mod dropout;
pub mod optimizations;
pub mod peak_hours;
pub mod repeat;
pub mod sentiment;

pub use dropout::{analyze_dropout, DropoutAnalysis, Severity};
pub use optimizations::{generate_optimizations, Impact, Optimization, OptimizationKind};
pub use peak_hours::{analyze_peak_hours, PeakHoursAnalysis};
pub use repeat::{analyze_repeat_attendees, RepeatAttendeeAnalysis};
pub use sentiment::{analyze_sentiment, classify_comment, SentimentAnalysis};

use crate::error::Result;
use crate::store::EventStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The full insight document for one event.
///
/// Entirely recomputable from the store; written with a full overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiInsights {
    /// Event this document describes
    pub event_id: String,
    /// Busiest check-in hour and its dominance
    pub peak_hours: PeakHoursAnalysis,
    /// Aggregate comment sentiment
    pub sentiment: SentimentAnalysis,
    /// Actionable suggestions, in rule order
    pub optimization_predictions: Vec<Optimization>,
    /// Dropout severity
    pub dropout: DropoutAnalysis,
    /// Repeat-attendance rate
    pub repeat_attendees: RepeatAttendeeAnalysis,
    /// Stamped at generation time
    pub last_updated: DateTime<Utc>,
}

/// Outcome of one generation attempt, stored in `insight_runs`.
#[derive(Debug, Clone)]
pub struct InsightRun {
    /// Event the attempt was for
    pub event_id: String,
    /// When the attempt started
    pub started_at: DateTime<Utc>,
    /// How long it took (milliseconds)
    pub duration_ms: i64,
    /// Whether it produced a document
    pub status: InsightRunStatus,
    /// Error message if the attempt failed
    pub error_message: Option<String>,
}

/// Status of an insight generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightRunStatus {
    /// A document was generated and written
    Success,
    /// No analytics row existed; nothing to derive from
    Skipped,
    /// The attempt failed
    Error,
}

impl InsightRunStatus {
    /// Convert to string for store storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightRunStatus::Success => "success",
            InsightRunStatus::Skipped => "skipped",
            InsightRunStatus::Error => "error",
        }
    }

    /// Parse status string from storage.
    pub fn from_storage(value: &str) -> Self {
        match value {
            "success" => InsightRunStatus::Success,
            "skipped" => InsightRunStatus::Skipped,
            _ => InsightRunStatus::Error,
        }
    }
}

/// Outcome of a batch regeneration pass.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Events whose insight document was rewritten
    pub generated: usize,
    /// Events skipped (analytics row vanished mid-pass)
    pub skipped: usize,
    /// Events that failed, with the error text
    pub errors: Vec<(String, String)>,
}

/// Generate and store the insight document for one event.
///
/// Returns `Ok(None)` (after logging) when no analytics row exists. Each
/// attempt is recorded in `insight_runs` regardless of outcome.
pub fn generate(store: &EventStore, event_id: &str) -> Result<Option<AiInsights>> {
    let started_at = Utc::now();
    let start = Instant::now();

    let outcome = generate_inner(store, event_id);
    let duration_ms = start.elapsed().as_millis() as i64;

    let (status, error_message) = match &outcome {
        Ok(Some(_)) => (InsightRunStatus::Success, None),
        Ok(None) => (InsightRunStatus::Skipped, None),
        Err(e) => (InsightRunStatus::Error, Some(e.to_string())),
    };

    let run = InsightRun {
        event_id: event_id.to_string(),
        started_at,
        duration_ms,
        status,
        error_message,
    };
    if let Err(e) = store.insert_insight_run(&run) {
        tracing::warn!(error = %e, "Failed to record insight run");
    }

    outcome
}

fn generate_inner(store: &EventStore, event_id: &str) -> Result<Option<AiInsights>> {
    let analytics = match store.get_analytics(event_id)? {
        Some(analytics) => analytics,
        None => {
            tracing::info!(event_id, "No analytics data found for event");
            return Ok(None);
        }
    };

    let comments = store.comments_for_event(event_id)?;
    let attendance = store.attendance_for_event(event_id)?;

    let peak_hours = analyze_peak_hours(&analytics.hourly_sign_ins);
    let sentiment = analyze_sentiment(&comments);
    let optimization_predictions = generate_optimizations(&analytics, &peak_hours, &sentiment);
    let dropout = analyze_dropout(&analytics);
    let repeat_attendees = analyze_repeat_attendees(&analytics);

    let insights = AiInsights {
        event_id: event_id.to_string(),
        peak_hours,
        sentiment,
        optimization_predictions,
        dropout,
        repeat_attendees,
        last_updated: Utc::now(),
    };

    store.put_insights(&insights)?;

    tracing::info!(
        event_id,
        comment_count = comments.len(),
        attendance_count = attendance.len(),
        optimizations = insights.optimization_predictions.len(),
        "Insights generated and saved"
    );

    Ok(Some(insights))
}

/// Regenerate insights for every event whose analytics meet the attendee
/// floor. Per-event failures are collected, not fatal to the batch.
pub fn regenerate_all(store: &EventStore, min_attendees: i64) -> Result<BatchOutcome> {
    let event_ids = store.events_with_min_attendees(min_attendees)?;
    let mut outcome = BatchOutcome::default();

    for event_id in event_ids {
        match generate(store, &event_id) {
            Ok(Some(_)) => outcome.generated += 1,
            Ok(None) => outcome.skipped += 1,
            Err(e) => {
                tracing::error!(event_id, error = %e, "Insight regeneration failed");
                outcome.errors.push((event_id, e.to_string()));
            }
        }
    }

    Ok(outcome)
}
