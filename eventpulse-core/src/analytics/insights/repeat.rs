//! Repeat-attendee rate analysis.

use crate::types::EventAnalytics;
use serde::{Deserialize, Serialize};

/// Repeat-attendance rate with a fixed recommendation per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatAttendeeAnalysis {
    /// `repeat_attendees / total_attendees * 100`, 0 with no attendees
    pub repeat_rate: f64,
    /// Counter carried over from the analytics row
    pub repeat_attendees: i64,
    /// Attendee total carried for display
    pub total_attendees: i64,
    /// Fixed recommendation per tier (>50 excellent, >25 good, else low)
    pub recommendation: String,
    /// Fixed at 0.8
    pub confidence: f64,
}

/// Tier the repeat-attendance rate.
pub fn analyze_repeat_attendees(analytics: &EventAnalytics) -> RepeatAttendeeAnalysis {
    let repeat_rate = if analytics.total_attendees > 0 {
        analytics.repeat_attendees as f64 / analytics.total_attendees as f64 * 100.0
    } else {
        0.0
    };

    let recommendation = if repeat_rate > 50.0 {
        "Excellent repeat attendance! Your events have strong community building."
    } else if repeat_rate > 25.0 {
        "Good repeat attendance. Consider loyalty programs to increase retention."
    } else {
        "Low repeat attendance. Focus on building community and improving event quality."
    };

    RepeatAttendeeAnalysis {
        repeat_rate,
        repeat_attendees: analytics.repeat_attendees,
        total_attendees: analytics.total_attendees,
        recommendation: recommendation.to_string(),
        confidence: 0.8,
    }
}
