//! Trigger pipeline
//!
//! Routes externally delivered document-change events to the aggregation and
//! insight components:
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ Trigger runtime │ ──► │ TriggerPipeline  │ ──► │   EventStore    │
//! │ (created/updated│     │                  │     │ (analytics,     │
//! │  /tick events)  │     │                  │     │  insights)      │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!                               │
//!                               ▼
//!                  attendance ──► aggregate ──► delta check ──► generate
//! ```
//!
//! Delivery is at-least-once with no cross-document ordering, so handlers
//! never assume related documents exist yet. Error policy follows the split
//! between source-of-truth aggregates and best-effort insights: attendance
//! aggregation errors propagate (the runtime may redeliver), while feedback
//! aggregation and insight generation errors are logged and absorbed so a
//! derived computation can never cause a retry storm.

use crate::analytics::{aggregator, insights};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::store::EventStore;
use crate::types::{AttendanceRecord, EventAnalytics, FeedbackRecord};
use chrono::{DateTime, Utc};

/// A document change or schedule tick delivered by the trigger runtime.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A new attendance record was created
    AttendanceCreated(AttendanceRecord),
    /// A new feedback record was created
    FeedbackCreated(FeedbackRecord),
    /// An analytics row changed, with before/after snapshots
    AnalyticsUpdated {
        /// Event whose analytics changed
        event_id: String,
        /// Snapshot before the write, if the row existed
        before: Option<EventAnalytics>,
        /// Snapshot after the write
        after: EventAnalytics,
    },
    /// Cron-style schedule tick, no payload beyond the firing time
    Tick {
        /// When the tick fired
        fired_at: DateTime<Utc>,
    },
}

/// Routes change events through aggregation and insight generation.
pub struct TriggerPipeline {
    store: EventStore,
    analytics: AnalyticsConfig,
}

impl TriggerPipeline {
    /// Create a pipeline over a store.
    pub fn new(store: EventStore, analytics: AnalyticsConfig) -> Self {
        Self { store, analytics }
    }

    /// The underlying store.
    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Persist an attendance record and dispatch its creation event.
    ///
    /// The local store commits each write exactly once, which is what makes
    /// the aggregator's at-most-once assumption hold on this path.
    pub fn record_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        self.store.insert_attendance(record)?;
        self.handle(ChangeEvent::AttendanceCreated(record.clone()))
    }

    /// Persist a feedback record and dispatch its creation event.
    pub fn record_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        self.store.insert_feedback(record)?;
        self.handle(ChangeEvent::FeedbackCreated(record.clone()))
    }

    /// Dispatch one delivered change event.
    pub fn handle(&self, event: ChangeEvent) -> Result<()> {
        match event {
            ChangeEvent::AttendanceCreated(record) => {
                tracing::info!(
                    event_id = record.event_id,
                    "Processing attendance for event"
                );
                // Errors here propagate: the delivery runtime may redeliver.
                let delta = match aggregator::apply_attendance(&self.store, &record) {
                    Ok(delta) => delta,
                    Err(e) => {
                        tracing::error!(
                            event_id = record.event_id,
                            error = %e,
                            "Error aggregating attendance data"
                        );
                        return Err(e);
                    }
                };
                if let Some(delta) = delta {
                    self.handle(ChangeEvent::AnalyticsUpdated {
                        event_id: record.event_id.clone(),
                        before: delta.before,
                        after: delta.after,
                    })?;
                }
                Ok(())
            }
            ChangeEvent::FeedbackCreated(record) => {
                tracing::info!(event_id = record.event_id, "Processing feedback for event");
                match aggregator::apply_feedback(&self.store, &record, &self.analytics) {
                    Ok(delta) => self.handle(ChangeEvent::AnalyticsUpdated {
                        event_id: record.event_id.clone(),
                        before: delta.before,
                        after: delta.after,
                    }),
                    Err(e) => {
                        // Best-effort path: absorbed so feedback can never
                        // trigger redelivery.
                        tracing::error!(
                            event_id = record.event_id,
                            error = %e,
                            "Error aggregating feedback data"
                        );
                        Ok(())
                    }
                }
            }
            ChangeEvent::AnalyticsUpdated {
                event_id,
                before,
                after,
            } => {
                if should_generate(before.as_ref(), &after, self.analytics.insight_min_attendees) {
                    tracing::info!(event_id, "Generating insights for event");
                    if let Err(e) = insights::generate(&self.store, &event_id) {
                        tracing::error!(event_id, error = %e, "Error generating insights");
                    }
                } else {
                    tracing::debug!(event_id, "Insufficient new data for insight generation");
                }
                Ok(())
            }
            ChangeEvent::Tick { fired_at } => {
                tracing::info!(%fired_at, "Scheduled tick: regenerating insights");
                match insights::regenerate_all(&self.store, self.analytics.insight_min_attendees) {
                    Ok(outcome) => {
                        tracing::info!(
                            generated = outcome.generated,
                            skipped = outcome.skipped,
                            failed = outcome.errors.len(),
                            "Batch regeneration complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Batch regeneration failed");
                    }
                }
                Ok(())
            }
        }
    }
}

/// Edge-triggered threshold for insight generation: the attendee count grew
/// and has reached the floor. No debouncing; once past the floor every
/// qualifying increment fires again.
pub fn should_generate(
    before: Option<&EventAnalytics>,
    after: &EventAnalytics,
    min_attendees: i64,
) -> bool {
    let before_attendees = before.map_or(0, |b| b.total_attendees);
    after.total_attendees > before_attendees && after.total_attendees >= min_attendees
}
