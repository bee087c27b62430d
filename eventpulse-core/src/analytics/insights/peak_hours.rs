//! Peak-hour analysis over hourly sign-in buckets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which hour drew the most check-ins, and how dominant it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakHoursAnalysis {
    /// "HH:00" bucket with the highest count, if any data exists
    pub peak_hour: Option<String>,
    /// Check-ins in the peak bucket
    pub peak_count: i64,
    /// Check-ins across all buckets
    pub total_sign_ins: i64,
    /// Share of all check-ins that landed in the peak bucket
    pub confidence: f64,
    /// Fixed recommendation keyed on the peak hour's range
    pub recommendation: String,
    /// The full input distribution, carried for display
    pub hourly_distribution: BTreeMap<String, i64>,
}

/// Find the busiest hour bucket. Ties go to the earliest hour, since buckets
/// are visited in ascending order and only a strictly greater count wins.
pub fn analyze_peak_hours(hourly_sign_ins: &BTreeMap<String, i64>) -> PeakHoursAnalysis {
    if hourly_sign_ins.is_empty() {
        return PeakHoursAnalysis {
            peak_hour: None,
            peak_count: 0,
            total_sign_ins: 0,
            confidence: 0.0,
            recommendation: "Insufficient data for peak hour analysis".to_string(),
            hourly_distribution: BTreeMap::new(),
        };
    }

    let mut peak_hour = "";
    let mut peak_count = 0i64;
    let mut total_sign_ins = 0i64;

    for (hour, count) in hourly_sign_ins {
        total_sign_ins += count;
        if *count > peak_count {
            peak_count = *count;
            peak_hour = hour;
        }
    }

    let confidence = if total_sign_ins > 0 {
        peak_count as f64 / total_sign_ins as f64
    } else {
        0.0
    };

    let recommendation = if peak_hour.is_empty() {
        String::new()
    } else {
        recommend_for_hour(peak_hour)
    };

    PeakHoursAnalysis {
        peak_hour: (!peak_hour.is_empty()).then(|| peak_hour.to_string()),
        peak_count,
        total_sign_ins,
        confidence,
        recommendation,
        hourly_distribution: hourly_sign_ins.clone(),
    }
}

/// Numeric hour of a "HH:00" bucket.
pub(crate) fn bucket_hour(bucket: &str) -> Option<i64> {
    bucket.split(':').next()?.parse().ok()
}

fn recommend_for_hour(peak_hour: &str) -> String {
    match bucket_hour(peak_hour) {
        Some(hour) if (9..=11).contains(&hour) => {
            "Morning events (9-11 AM) show highest engagement. Consider scheduling future events during this time."
                .to_string()
        }
        Some(hour) if (12..=14).contains(&hour) => {
            "Lunch time (12-2 PM) is your peak period. Lunch-and-learn events could be highly successful."
                .to_string()
        }
        Some(hour) if (17..=19).contains(&hour) => {
            "Evening hours (5-7 PM) are most popular. After-work events align well with attendee preferences."
                .to_string()
        }
        _ => format!("Peak attendance at {peak_hour}. Consider this timing for future events."),
    }
}
