//! Transactional attendance and feedback aggregation
//!
//! Maintains one `event_analytics` row per event. Both entry points run as a
//! read-modify-write inside a single store transaction scoped to that row, so
//! concurrent writes to the same event are linearized and readers never see a
//! partial update. Different events never contend.
//!
//! Two deliberate properties worth knowing about:
//! - **Replays double-count.** Aggregation assumes each attendance record is
//!   delivered at most once. Re-delivering the same record increments
//!   `total_attendees` and the hour bucket again; deduplication by record id
//!   was intentionally not added so backfills behave like the live path.
//! - **Repeat-attendee recompute is a full scan.** Every check-in by a
//!   signed-in customer re-derives the distinct-event count across all of the
//!   host's events rather than incrementing. Correct under corrections and
//!   backfills, but O(host's event history) per check-in; hosts with very
//!   large histories will need pagination here eventually.

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::store::EventStore;
use crate::types::{
    AttendanceRecord, EventAnalytics, FeedbackAnalytics, FeedbackRecord, Sentiment,
};
use chrono::{DateTime, FixedOffset, Timelike, Utc};

/// Before/after snapshots of one aggregation step.
///
/// Handed to the insight trigger so it can run its delta check without
/// re-reading the store.
#[derive(Debug, Clone)]
pub struct AnalyticsDelta {
    /// Analytics row before the write, if one existed
    pub before: Option<EventAnalytics>,
    /// Analytics row as written
    pub after: EventAnalytics,
}

/// Hour bucket for a check-in, e.g. "09:00".
///
/// Uses the hour in the timestamp's own offset, i.e. the check-in device's
/// local clock.
pub fn hour_bucket(attended_at: &DateTime<FixedOffset>) -> String {
    format!("{:02}:00", attended_at.hour())
}

/// Merge a new attendance record into its event's analytics row.
///
/// Returns `None` for pre-registration placeholders: those represent intent,
/// not a check-in, and only feed the dropout-rate denominator.
pub fn apply_attendance(
    store: &EventStore,
    record: &AttendanceRecord,
) -> Result<Option<AnalyticsDelta>> {
    if record.customer.is_pre_registered() {
        tracing::debug!(
            event_id = record.event_id,
            "Registration placeholder, not a check-in; skipping aggregation"
        );
        return Ok(None);
    }

    let bucket = hour_bucket(&record.attended_at);

    let delta = store.with_transaction(|tx| {
        let before = tx.get_analytics(&record.event_id)?;
        let mut analytics = before
            .clone()
            .unwrap_or_else(|| EventAnalytics::empty(&record.event_id, Utc::now()));

        analytics.total_attendees += 1;
        *analytics.hourly_sign_ins.entry(bucket.clone()).or_insert(0) += 1;

        // Repeat attendees: distinct prior events of this host the customer
        // attended. Recomputed in full, not incremented.
        if let Some(uid) = record.customer.uid() {
            match tx.get_event(&record.event_id)? {
                Some(event) => {
                    let host_events = tx.event_ids_for_host(&event.host_uid)?;
                    analytics.repeat_attendees =
                        tx.distinct_events_attended(uid, &host_events, &record.event_id)?;
                }
                None => {
                    tracing::warn!(
                        event_id = record.event_id,
                        "Event record missing; skipping repeat-attendee recompute"
                    );
                }
            }
        }

        // Dropout rate goes negative when walk-ins push attendance past the
        // pre-registration count; not clamped.
        let pre_registered = tx.count_pre_registered(&record.event_id)?;
        analytics.dropout_rate = if pre_registered > 0 {
            (pre_registered - analytics.total_attendees) as f64 / pre_registered as f64 * 100.0
        } else {
            0.0
        };

        analytics.last_updated = Utc::now();
        tx.put_analytics(&analytics)?;

        Ok(AnalyticsDelta {
            before,
            after: analytics,
        })
    })?;

    tracing::info!(
        event_id = record.event_id,
        total_attendees = delta.after.total_attendees,
        "Updated analytics for attendance"
    );

    Ok(Some(delta))
}

/// Merge a new feedback record into its event's analytics row.
///
/// The nested feedback block is created lazily on the first feedback for an
/// event; the running mean is updated without rescanning prior records.
pub fn apply_feedback(
    store: &EventStore,
    record: &FeedbackRecord,
    config: &AnalyticsConfig,
) -> Result<AnalyticsDelta> {
    let delta = store.with_transaction(|tx| {
        let before = tx.get_analytics(&record.event_id)?;
        let mut analytics = before
            .clone()
            .unwrap_or_else(|| EventAnalytics::empty(&record.event_id, Utc::now()));

        let feedback = analytics
            .feedback
            .get_or_insert_with(FeedbackAnalytics::empty);

        let total_ratings = feedback.total_ratings + 1;
        let rating_sum =
            feedback.average_rating * feedback.total_ratings as f64 + record.rating as f64;
        feedback.average_rating = rating_sum / total_ratings as f64;
        feedback.total_ratings = total_ratings;

        *feedback
            .rating_distribution
            .entry(record.rating)
            .or_insert(0) += 1;

        if record.is_anonymous {
            feedback.anonymous_count += 1;
        } else {
            feedback.named_count += 1;
        }

        feedback.sentiment = Sentiment::from_average_rating(feedback.average_rating);

        // Once the cap is reached, later comments are dropped; the first
        // summaries are never evicted.
        if let Some(comment) = record.comment.as_deref() {
            if !comment.is_empty() && feedback.comment_summaries.len() < config.comment_summary_limit
            {
                feedback
                    .comment_summaries
                    .push(summarize_comment(comment, config.comment_summary_max_chars));
            }
        }

        analytics.last_updated = Utc::now();
        tx.put_analytics(&analytics)?;

        Ok(AnalyticsDelta {
            before,
            after: analytics,
        })
    })?;

    tracing::info!(
        event_id = record.event_id,
        total_ratings = delta
            .after
            .feedback
            .as_ref()
            .map_or(0, |f| f.total_ratings),
        "Updated feedback analytics"
    );

    Ok(delta)
}

/// Truncate a comment to at most `max_chars` characters, with an ellipsis.
fn summarize_comment(comment: &str, max_chars: usize) -> String {
    if comment.chars().count() > max_chars {
        let truncated: String = comment.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        comment.to_string()
    }
}
