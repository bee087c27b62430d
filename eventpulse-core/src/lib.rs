//! # eventpulse-core
//!
//! Core library for eventpulse - the analytics backend of an event-management app.
//!
//! This library provides:
//! - Domain types for events, attendance, comments, and feedback
//! - An event store backed by SQLite
//! - Transactional per-event analytics aggregation
//! - Threshold-triggered insight generation
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data lives in three layers:
//! - **Source documents:** events, attendance, comments, feedback (written by
//!   external client flows; immutable once created)
//! - **Aggregates:** one `event_analytics` row per event, merged
//!   transactionally on every attendance/feedback write
//! - **Insights:** one `ai_insights` document per event, recomputed wholesale
//!   whenever the attendee count crosses the configured floor (regenerable)
//!
//! ## Example
//!
//! ```rust,no_run
//! use eventpulse_core::{Config, EventStore, TriggerPipeline};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the store
//! let store = EventStore::open(&Config::database_path()).expect("failed to open store");
//! store.migrate().expect("failed to run migrations");
//!
//! // Wire the pipeline; the trigger runtime feeds it change events
//! let pipeline = TriggerPipeline::new(store, config.analytics);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{ChangeEvent, TriggerPipeline};
pub use store::EventStore;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod types;
