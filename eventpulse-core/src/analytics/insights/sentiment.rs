//! Keyword-based comment sentiment.
//!
//! Deliberately a fixed rule table, not a model: each comment is scored by
//! counting positive and negative keyword hits (case-insensitive substring
//! match) and the majority side wins.

use crate::types::{CommentRecord, Sentiment};
use serde::{Deserialize, Serialize};

const POSITIVE_KEYWORDS: [&str; 19] = [
    "great",
    "awesome",
    "amazing",
    "excellent",
    "fantastic",
    "wonderful",
    "good",
    "nice",
    "love",
    "enjoy",
    "happy",
    "satisfied",
    "impressed",
    "outstanding",
    "brilliant",
    "perfect",
    "best",
    "favorite",
    "recommend",
];

const NEGATIVE_KEYWORDS: [&str; 19] = [
    "bad",
    "terrible",
    "awful",
    "horrible",
    "disappointing",
    "poor",
    "worst",
    "hate",
    "dislike",
    "boring",
    "waste",
    "useless",
    "frustrated",
    "angry",
    "annoyed",
    "confused",
    "difficult",
    "problem",
    "issue",
];

/// Aggregate sentiment over an event's comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    /// Share of classified comments that scored positive
    pub positive_ratio: f64,
    /// Share that scored negative
    pub negative_ratio: f64,
    /// Share that scored neutral
    pub neutral_ratio: f64,
    /// Positive when the positive share exceeds 0.6, negative when the
    /// negative share does, neutral otherwise
    pub overall: Sentiment,
    /// Fixed recommendation per overall sentiment
    pub recommendation: String,
    /// 0.8 when any comment was classified, 0 otherwise
    pub confidence: f64,
    /// Comments with non-empty text that were classified
    pub total_comments: i64,
    /// Comments scoring positive
    pub positive_count: i64,
    /// Comments scoring negative
    pub negative_count: i64,
    /// Comments scoring neutral
    pub neutral_count: i64,
}

/// Classify one comment by keyword majority.
pub fn classify_comment(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = keyword_hits(&text, &POSITIVE_KEYWORDS);
    let negative = keyword_hits(&text, &NEGATIVE_KEYWORDS);

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn keyword_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Classify every comment and aggregate the ratios.
pub fn analyze_sentiment(comments: &[CommentRecord]) -> SentimentAnalysis {
    if comments.is_empty() {
        return SentimentAnalysis {
            positive_ratio: 0.0,
            negative_ratio: 0.0,
            neutral_ratio: 1.0,
            overall: Sentiment::Neutral,
            recommendation: "No comments available for sentiment analysis".to_string(),
            confidence: 0.0,
            total_comments: 0,
            positive_count: 0,
            negative_count: 0,
            neutral_count: 0,
        };
    }

    let mut positive_count = 0i64;
    let mut negative_count = 0i64;
    let mut neutral_count = 0i64;

    for comment in comments {
        if comment.text.is_empty() {
            continue;
        }
        match classify_comment(&comment.text) {
            Sentiment::Positive => positive_count += 1,
            Sentiment::Negative => negative_count += 1,
            Sentiment::Neutral => neutral_count += 1,
        }
    }

    let total = positive_count + negative_count + neutral_count;
    let (positive_ratio, negative_ratio, neutral_ratio) = if total > 0 {
        (
            positive_count as f64 / total as f64,
            negative_count as f64 / total as f64,
            neutral_count as f64 / total as f64,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let overall = if positive_ratio > 0.6 {
        Sentiment::Positive
    } else if negative_ratio > 0.6 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    let recommendation = match overall {
        Sentiment::Positive => {
            "Excellent feedback! Attendees are highly satisfied. Consider expanding similar event formats."
        }
        Sentiment::Negative => {
            "Address attendee concerns. Consider gathering more detailed feedback to improve future events."
        }
        Sentiment::Neutral => {
            "Mixed feedback received. Consider implementing feedback surveys to better understand attendee needs."
        }
    };

    SentimentAnalysis {
        positive_ratio,
        negative_ratio,
        neutral_ratio,
        overall,
        recommendation: recommendation.to_string(),
        confidence: if total > 0 { 0.8 } else { 0.0 },
        total_comments: total,
        positive_count,
        negative_count,
        neutral_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(text: &str) -> CommentRecord {
        CommentRecord::new("evt-1", None, text, Utc::now())
    }

    #[test]
    fn test_classify_positive() {
        // Two positive hits ("great", "amazing"), zero negative
        assert_eq!(
            classify_comment("This event was great and amazing"),
            Sentiment::Positive
        );
    }

    #[test]
    fn test_classify_negative() {
        assert_eq!(classify_comment("terrible and boring"), Sentiment::Negative);
    }

    #[test]
    fn test_classify_neutral_no_keywords() {
        assert_eq!(classify_comment("the venue had chairs"), Sentiment::Neutral);
    }

    #[test]
    fn test_classify_tie_is_neutral() {
        assert_eq!(
            classify_comment("good event, bad coffee"),
            Sentiment::Neutral
        );
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify_comment("GREAT TALK"), Sentiment::Positive);
    }

    #[test]
    fn test_no_comments() {
        let analysis = analyze_sentiment(&[]);
        assert_eq!(analysis.overall, Sentiment::Neutral);
        assert_eq!(analysis.neutral_ratio, 1.0);
        assert_eq!(analysis.confidence, 0.0);
        assert!(analysis.recommendation.starts_with("No comments"));
    }

    #[test]
    fn test_overall_positive_needs_strict_majority() {
        // 3 of 4 positive = 0.75 > 0.6
        let comments = vec![
            comment("great"),
            comment("awesome"),
            comment("perfect"),
            comment("meh"),
        ];
        let analysis = analyze_sentiment(&comments);
        assert_eq!(analysis.overall, Sentiment::Positive);
        assert_eq!(analysis.positive_count, 3);
        assert_eq!(analysis.neutral_count, 1);
        assert_eq!(analysis.confidence, 0.8);

        // 3 of 5 positive = 0.6, not > 0.6
        let comments = vec![
            comment("great"),
            comment("awesome"),
            comment("perfect"),
            comment("meh"),
            comment("ok"),
        ];
        assert_eq!(analyze_sentiment(&comments).overall, Sentiment::Neutral);
    }

    #[test]
    fn test_empty_text_comments_are_ignored() {
        let comments = vec![comment(""), comment("")];
        let analysis = analyze_sentiment(&comments);
        assert_eq!(analysis.total_comments, 0);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.overall, Sentiment::Neutral);
    }
}
