//! Core domain types for eventpulse
//!
//! These types mirror the documents the mobile clients write into the event
//! store, plus the per-event aggregate the pipeline maintains.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | A hosted gathering with a scheduled date/time, host, location |
//! | **Attendance record** | Proof a customer checked into an Event; immutable once created |
//! | **Sentinel customer** | Reserved values in the customer field for check-ins without a real account |
//! | **Analytics document** | Per-event aggregate counters and derived rates |
//! | **Insight** | Derived, best-effort analysis recomputed wholesale from the aggregates |
//!
//! ### Sentinel customers
//!
//! The check-in flow stores special strings where a customer uid would
//! normally go: `"manual"` (host added the attendee by hand),
//! `"pre-registered"` (registered but not yet checked in) and
//! `"without_login"` (checked in without signing in). [`CustomerRef`] makes
//! those cases explicit instead of leaving them as stringly-typed magic.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================
// Customers
// ============================================

/// The customer field of an attendance record.
///
/// Either a real account uid or one of the reserved sentinel values the
/// check-in flow uses when no account is involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CustomerRef {
    /// A signed-in customer's account uid
    Uid(String),
    /// Attendee added manually by the host
    Manual,
    /// Registered ahead of time but not checked in
    PreRegistered,
    /// Checked in without signing in
    WithoutLogin,
}

impl CustomerRef {
    /// Returns the storage representation (the uid or the sentinel string).
    pub fn as_str(&self) -> &str {
        match self {
            CustomerRef::Uid(uid) => uid,
            CustomerRef::Manual => "manual",
            CustomerRef::PreRegistered => "pre-registered",
            CustomerRef::WithoutLogin => "without_login",
        }
    }

    /// Parse the storage representation back into a typed reference.
    pub fn from_storage(value: &str) -> Self {
        match value {
            "manual" => CustomerRef::Manual,
            "pre-registered" => CustomerRef::PreRegistered,
            "without_login" => CustomerRef::WithoutLogin,
            uid => CustomerRef::Uid(uid.to_string()),
        }
    }

    /// Whether this is a registration placeholder rather than a check-in.
    pub fn is_pre_registered(&self) -> bool {
        matches!(self, CustomerRef::PreRegistered)
    }

    /// The account uid, if this reference carries one.
    pub fn uid(&self) -> Option<&str> {
        match self {
            CustomerRef::Uid(uid) => Some(uid),
            _ => None,
        }
    }
}

impl From<String> for CustomerRef {
    fn from(value: String) -> Self {
        CustomerRef::from_storage(&value)
    }
}

impl From<CustomerRef> for String {
    fn from(value: CustomerRef) -> Self {
        value.as_str().to_string()
    }
}

// ============================================
// Source documents
// ============================================

/// A hosted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Account uid of the host
    pub host_uid: String,
    /// Scheduled start
    pub starts_at: DateTime<Utc>,
    /// Free-form location text
    pub location: Option<String>,
}

/// Proof a customer checked into an event.
///
/// Created by the check-in flow and immutable afterwards; the pipeline only
/// ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Unique identifier
    pub id: String,
    /// Event that was attended
    pub event_id: String,
    /// Who attended (or a sentinel)
    pub customer: CustomerRef,
    /// When the check-in happened, in the check-in device's local offset
    pub attended_at: DateTime<FixedOffset>,
}

impl AttendanceRecord {
    /// Create a record with a fresh id.
    pub fn new(event_id: &str, customer: CustomerRef, attended_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            customer,
            attended_at,
        }
    }
}

/// A free-form comment left on an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Unique identifier
    pub id: String,
    /// Event the comment is about
    pub event_id: String,
    /// Author account uid, if signed in
    pub author_uid: Option<String>,
    /// Comment text
    pub text: String,
    /// When the comment was posted
    pub posted_at: DateTime<Utc>,
}

impl CommentRecord {
    /// Create a comment with a fresh id.
    pub fn new(event_id: &str, author_uid: Option<&str>, text: &str, posted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            author_uid: author_uid.map(|uid| uid.to_string()),
            text: text.to_string(),
            posted_at,
        }
    }
}

/// Structured post-event feedback: a rating plus an optional comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique identifier
    pub id: String,
    /// Event the feedback is for
    pub event_id: String,
    /// Rating value (the clients send 1-5)
    pub rating: i64,
    /// Optional free-form comment
    pub comment: Option<String>,
    /// Whether the submitter chose to stay anonymous
    pub is_anonymous: bool,
    /// When the feedback was submitted
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Create a feedback record with a fresh id.
    pub fn new(event_id: &str, rating: i64, comment: Option<&str>, is_anonymous: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            rating,
            comment: comment.map(|c| c.to_string()),
            is_anonymous,
            submitted_at: Utc::now(),
        }
    }
}

// ============================================
// Derived aggregates
// ============================================

/// Overall sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// String form used in stored documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Classify an average rating: >= 4.0 positive, >= 3.0 neutral, else negative.
    pub fn from_average_rating(average: f64) -> Self {
        if average >= 4.0 {
            Sentiment::Positive
        } else if average >= 3.0 {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        }
    }
}

/// Aggregated feedback stats, nested inside [`EventAnalytics`].
///
/// Created lazily on the first feedback record for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnalytics {
    /// Running mean of all ratings
    pub average_rating: f64,
    /// Number of ratings received
    pub total_ratings: i64,
    /// Count per rating value
    pub rating_distribution: BTreeMap<i64, i64>,
    /// Sentiment derived from the running mean
    pub sentiment: Sentiment,
    /// Truncated comment texts, capped at the configured limit
    pub comment_summaries: Vec<String>,
    /// Feedback submitted anonymously
    pub anonymous_count: i64,
    /// Feedback submitted with a name attached
    pub named_count: i64,
}

impl FeedbackAnalytics {
    /// Empty stats, as created on the first feedback write.
    pub fn empty() -> Self {
        Self {
            average_rating: 0.0,
            total_ratings: 0,
            rating_distribution: BTreeMap::new(),
            sentiment: Sentiment::Neutral,
            comment_summaries: Vec::new(),
            anonymous_count: 0,
            named_count: 0,
        }
    }
}

/// Per-event aggregate counters and derived rates.
///
/// One row per event. All mutations go through the store's analytics
/// transaction, so concurrent writes to the same event are linearized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAnalytics {
    /// Event this aggregate belongs to
    pub event_id: String,
    /// Attendance records processed so far
    pub total_attendees: i64,
    /// Check-in count per "HH:00" hour bucket
    pub hourly_sign_ins: BTreeMap<String, i64>,
    /// Distinct prior events (same host, excluding this one) the latest
    /// triggering customer attended
    pub repeat_attendees: i64,
    /// `(pre_registered - total_attendees) / pre_registered * 100`;
    /// 0 with no pre-registrations, negative when attendance exceeds them
    pub dropout_rate: f64,
    /// Feedback aggregate, present once the first feedback arrives
    pub feedback: Option<FeedbackAnalytics>,
    /// Stamped on every mutation
    pub last_updated: DateTime<Utc>,
}

impl EventAnalytics {
    /// Default-initialized aggregate for an event with no prior analytics.
    pub fn empty(event_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.to_string(),
            total_attendees: 0,
            hourly_sign_ins: BTreeMap::new(),
            repeat_attendees: 0,
            dropout_rate: 0.0,
            feedback: None,
            last_updated: now,
        }
    }
}
