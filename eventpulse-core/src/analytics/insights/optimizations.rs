//! Optimization synthesis.
//!
//! A fixed rule list evaluated in order; each rule independently contributes
//! at most one suggestion. The order only affects presentation.

use super::peak_hours::{bucket_hour, PeakHoursAnalysis};
use super::sentiment::SentimentAnalysis;
use crate::types::{EventAnalytics, Sentiment};
use serde::{Deserialize, Serialize};

/// What a suggestion is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationKind {
    Timing,
    Scheduling,
    Engagement,
    Retention,
    Feedback,
}

/// Expected payoff of acting on a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// One actionable suggestion for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    /// Suggestion category
    #[serde(rename = "type")]
    pub kind: OptimizationKind,
    /// Short headline
    pub title: String,
    /// What to change and the claimed effect
    pub description: String,
    /// Expected payoff
    pub impact: Impact,
    /// How sure the rule is (fixed per rule, except timing which inherits
    /// the peak-hour confidence)
    pub confidence: f64,
    /// Concrete first step
    pub implementation: String,
}

impl Optimization {
    fn new(
        kind: OptimizationKind,
        title: &str,
        description: &str,
        impact: Impact,
        confidence: f64,
        implementation: &str,
    ) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description: description.to_string(),
            impact,
            confidence,
            implementation: implementation.to_string(),
        }
    }
}

/// Evaluate the rule list against the current aggregates and analyses.
pub fn generate_optimizations(
    analytics: &EventAnalytics,
    peak_hours: &PeakHoursAnalysis,
    sentiment: &SentimentAnalysis,
) -> Vec<Optimization> {
    let mut optimizations = Vec::new();

    let total_attendees = analytics.total_attendees;
    let dropout_rate = analytics.dropout_rate;
    let repeat_attendees = analytics.repeat_attendees;

    // Peak-hour timing
    if let Some(hour) = peak_hours.peak_hour.as_deref().and_then(bucket_hour) {
        if (9..=11).contains(&hour) {
            optimizations.push(Optimization::new(
                OptimizationKind::Timing,
                "Optimize Event Timing",
                "Shift events to morning hours (9-11 AM) for +35% attendance",
                Impact::High,
                peak_hours.confidence,
                "Schedule future events during peak morning hours",
            ));
        } else if (17..=19).contains(&hour) {
            optimizations.push(Optimization::new(
                OptimizationKind::Timing,
                "Evening Event Strategy",
                "Leverage evening peak (5-7 PM) for +25% attendance",
                Impact::Medium,
                peak_hours.confidence,
                "Focus on after-work events and networking sessions",
            ));
        }
    }

    // Weekend scheduling
    if total_attendees > 0 {
        optimizations.push(Optimization::new(
            OptimizationKind::Scheduling,
            "Weekend Events",
            "Shift to weekends for +40% attendance potential",
            Impact::High,
            0.7,
            "Schedule events on Saturdays or Sundays",
        ));
    }

    // Dropout reduction
    if dropout_rate > 20.0 {
        optimizations.push(Optimization::new(
            OptimizationKind::Engagement,
            "Reduce Dropout Rate",
            "Implement reminder system to reduce dropout by 30%",
            Impact::Medium,
            0.8,
            "Send SMS/email reminders 24h and 1h before events",
        ));
    }

    // Repeat attendance
    if repeat_attendees > 0 && total_attendees > 0 {
        let repeat_rate = repeat_attendees as f64 / total_attendees as f64 * 100.0;
        if repeat_rate < 30.0 {
            optimizations.push(Optimization::new(
                OptimizationKind::Retention,
                "Increase Repeat Attendance",
                "Implement loyalty program for +50% repeat attendance",
                Impact::High,
                0.6,
                "Create member benefits and early access programs",
            ));
        }
    }

    // Sentiment
    if sentiment.overall == Sentiment::Negative {
        optimizations.push(Optimization::new(
            OptimizationKind::Feedback,
            "Improve Event Quality",
            "Address feedback to improve satisfaction by 40%",
            Impact::High,
            0.9,
            "Conduct post-event surveys and implement feedback",
        ));
    }

    optimizations
}
