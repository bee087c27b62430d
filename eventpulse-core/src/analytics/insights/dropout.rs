//! Dropout severity analysis.

use crate::types::EventAnalytics;
use serde::{Deserialize, Serialize};

/// How bad the dropout rate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Dropout rate with a severity tier and fixed recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoutAnalysis {
    /// Rate carried over from the analytics row
    pub dropout_rate: f64,
    /// High above 50%, Medium above 25%, Low otherwise
    pub severity: Severity,
    /// Fixed recommendation per tier
    pub recommendation: String,
    /// Attendee total carried for display
    pub total_attendees: i64,
    /// Fixed at 0.8
    pub confidence: f64,
}

/// Tier the current dropout rate.
pub fn analyze_dropout(analytics: &EventAnalytics) -> DropoutAnalysis {
    let dropout_rate = analytics.dropout_rate;

    let (severity, recommendation) = if dropout_rate > 50.0 {
        (
            Severity::High,
            "High dropout rate detected. Consider improving event marketing and reminder systems.",
        )
    } else if dropout_rate > 25.0 {
        (
            Severity::Medium,
            "Moderate dropout rate. Implement better engagement strategies.",
        )
    } else {
        (
            Severity::Low,
            "Low dropout rate. Your event planning is effective!",
        )
    };

    DropoutAnalysis {
        dropout_rate,
        severity,
        recommendation: recommendation.to_string(),
        total_attendees: analytics.total_attendees,
        confidence: 0.8,
    }
}
