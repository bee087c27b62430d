//! Store schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- SOURCE DOCUMENTS (written by external flows)
    -- ============================================

    CREATE TABLE IF NOT EXISTS events (
        id               TEXT PRIMARY KEY,
        title            TEXT NOT NULL,
        host_uid         TEXT NOT NULL,
        starts_at        DATETIME NOT NULL,
        location         TEXT
    );

    CREATE TABLE IF NOT EXISTS attendance (
        id               TEXT PRIMARY KEY,
        event_id         TEXT NOT NULL,
        customer_uid     TEXT NOT NULL,
        -- RFC 3339 with the check-in device's offset preserved
        attended_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS comments (
        id               TEXT PRIMARY KEY,
        event_id         TEXT NOT NULL,
        author_uid       TEXT,
        text             TEXT NOT NULL,
        posted_at        DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS event_feedback (
        id               TEXT PRIMARY KEY,
        event_id         TEXT NOT NULL,
        rating           INTEGER NOT NULL,
        comment          TEXT,
        is_anonymous     INTEGER NOT NULL,
        submitted_at     DATETIME NOT NULL
    );

    -- ============================================
    -- DERIVED (regenerable aggregates)
    -- ============================================

    CREATE TABLE IF NOT EXISTS event_analytics (
        event_id         TEXT PRIMARY KEY,
        total_attendees  INTEGER NOT NULL,
        hourly_sign_ins  JSON NOT NULL,
        repeat_attendees INTEGER NOT NULL,
        dropout_rate     REAL NOT NULL,
        feedback         JSON,
        last_updated     DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ai_insights (
        event_id         TEXT PRIMARY KEY,
        document         JSON NOT NULL,
        last_updated     DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS insight_runs (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id         TEXT NOT NULL,
        started_at       DATETIME NOT NULL,
        duration_ms      INTEGER NOT NULL,
        status           TEXT NOT NULL,
        error_message    TEXT
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_events_host ON events(host_uid);
    CREATE INDEX IF NOT EXISTS idx_attendance_event ON attendance(event_id);
    CREATE INDEX IF NOT EXISTS idx_attendance_customer ON attendance(customer_uid);
    CREATE INDEX IF NOT EXISTS idx_attendance_event_customer ON attendance(event_id, customer_uid);
    CREATE INDEX IF NOT EXISTS idx_comments_event ON comments(event_id);
    CREATE INDEX IF NOT EXISTS idx_feedback_event ON event_feedback(event_id);
    CREATE INDEX IF NOT EXISTS idx_insight_runs_event ON insight_runs(event_id, started_at);
    CREATE INDEX IF NOT EXISTS idx_insight_runs_status ON insight_runs(status) WHERE status != 'success';
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking store migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the store
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
