//! Analytics pipeline for eventpulse
//!
//! Two layers of derived data are maintained per event:
//! - **Aggregates** (`event_analytics`): counters and rates merged
//!   transactionally on every attendance or feedback write. See
//!   [`aggregator`].
//! - **Insights** (`ai_insights`): best-effort analyses recomputed wholesale
//!   from the aggregates plus the raw comments and attendance. See
//!   [`insights`].
//!
//! The split matters for failure handling: aggregates are the source of
//! derived truth and their write errors propagate; insights are a cache and
//! their errors only ever cost freshness.

pub mod aggregator;
pub mod insights;

pub use aggregator::{apply_attendance, apply_feedback, hour_bucket, AnalyticsDelta};
pub use insights::{
    generate, regenerate_all, AiInsights, BatchOutcome, InsightRun, InsightRunStatus,
};
