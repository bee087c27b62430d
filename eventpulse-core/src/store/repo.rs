//! Store repository layer
//!
//! Provides query and insert operations for all document types, plus the
//! transactional read-modify-write scope the analytics aggregator runs in.

use crate::analytics::insights::{InsightRun, InsightRunStatus};
use crate::analytics::AiInsights;
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Deletes per statement when purging event data
const PURGE_BATCH_SIZE: usize = 300;

/// Bounded retries for transient transaction conflicts
const MAX_TX_ATTEMPTS: usize = 3;

/// Counts of rows removed by [`EventStore::purge_event_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    /// Attendance records deleted
    pub attendance: usize,
    /// Comments deleted
    pub comments: usize,
    /// Feedback records deleted
    pub feedback: usize,
    /// Analytics rows deleted (0 or 1)
    pub analytics: usize,
    /// Insight documents deleted (0 or 1)
    pub insights: usize,
    /// Insight run records deleted
    pub insight_runs: usize,
}

/// Store handle with a single serialized connection
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Open or create a store at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrency with external readers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this store
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Run a closure inside a write transaction scoped to this store.
    ///
    /// The closure sees a [`StoreTx`] view over the same tables. On success
    /// the transaction commits; on error it rolls back. Transient conflicts
    /// (busy/locked) retry the whole closure up to a small bound, so the
    /// closure must be a pure read-modify-write over store state.
    pub fn with_transaction<T>(&self, mut f: impl FnMut(&StoreTx<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            match f(&StoreTx::new(&tx)) {
                Ok(value) => {
                    tx.commit()?;
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempts < MAX_TX_ATTEMPTS => {
                    drop(tx);
                    tracing::debug!(attempts, "Transaction conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ============================================
    // Event operations
    // ============================================

    /// Insert or update an event
    pub fn upsert_event(&self, event: &EventRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        upsert_event(&conn, event)
    }

    /// Get an event by ID
    pub fn get_event(&self, id: &str) -> Result<Option<EventRecord>> {
        let conn = self.conn.lock().unwrap();
        get_event(&conn, id)
    }

    /// IDs of all events hosted by the given account
    pub fn event_ids_for_host(&self, host_uid: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        event_ids_for_host(&conn, host_uid)
    }

    // ============================================
    // Attendance operations
    // ============================================

    /// Insert an attendance record
    pub fn insert_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        insert_attendance(&conn, record)
    }

    /// All attendance records for an event, in check-in order
    pub fn attendance_for_event(&self, event_id: &str) -> Result<Vec<AttendanceRecord>> {
        let conn = self.conn.lock().unwrap();
        attendance_for_event(&conn, event_id)
    }

    /// Count of pre-registration placeholders for an event
    pub fn count_pre_registered(&self, event_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        count_pre_registered(&conn, event_id)
    }

    // ============================================
    // Comment and feedback operations
    // ============================================

    /// Insert a comment
    pub fn insert_comment(&self, comment: &CommentRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        insert_comment(&conn, comment)
    }

    /// All comments for an event, oldest first
    pub fn comments_for_event(&self, event_id: &str) -> Result<Vec<CommentRecord>> {
        let conn = self.conn.lock().unwrap();
        comments_for_event(&conn, event_id)
    }

    /// Insert a feedback record
    pub fn insert_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO event_feedback (id, event_id, rating, comment, is_anonymous, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                feedback.id,
                feedback.event_id,
                feedback.rating,
                feedback.comment,
                feedback.is_anonymous,
                feedback.submitted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ============================================
    // Analytics operations
    // ============================================

    /// Get the analytics row for an event
    pub fn get_analytics(&self, event_id: &str) -> Result<Option<EventAnalytics>> {
        let conn = self.conn.lock().unwrap();
        get_analytics(&conn, event_id)
    }

    /// Event IDs whose analytics meet the given attendee floor
    pub fn events_with_min_attendees(&self, min_attendees: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_id FROM event_analytics WHERE total_attendees >= ? ORDER BY event_id",
        )?;
        let ids = stmt
            .query_map([min_attendees], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    // ============================================
    // Insight operations
    // ============================================

    /// Overwrite the insight document for an event (full replace, not merge)
    pub fn put_insights(&self, insights: &AiInsights) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let document = serde_json::to_string(insights)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO ai_insights (event_id, document, last_updated)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                insights.event_id,
                document,
                insights.last_updated.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Get the insight document for an event
    pub fn get_insights(&self, event_id: &str) -> Result<Option<AiInsights>> {
        let conn = self.conn.lock().unwrap();
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM ai_insights WHERE event_id = ?",
                [event_id],
                |row| row.get(0),
            )
            .optional()?;
        match document {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    /// Record an insight generation attempt
    pub fn insert_insight_run(&self, run: &InsightRun) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO insight_runs (event_id, started_at, duration_ms, status, error_message)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                run.event_id,
                run.started_at.to_rfc3339(),
                run.duration_ms,
                run.status.as_str(),
                run.error_message,
            ],
        )?;
        Ok(())
    }

    /// Most recent insight runs for an event
    pub fn insight_runs_for_event(&self, event_id: &str, limit: usize) -> Result<Vec<InsightRun>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT event_id, started_at, duration_ms, status, error_message
            FROM insight_runs
            WHERE event_id = ?
            ORDER BY started_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let runs = stmt
            .query_map(params![event_id, limit as i64], row_to_insight_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    // ============================================
    // Maintenance
    // ============================================

    /// Remove everything the store holds for one event, in chunked deletes
    /// inside a single transaction. Source documents and derived rows both
    /// go; the `events` row itself is owned by the event CRUD flow and is
    /// left alone.
    pub fn purge_event_data(&self, event_id: &str) -> Result<PurgeSummary> {
        self.with_transaction(|tx| {
            let summary = PurgeSummary {
                attendance: delete_chunked(tx.conn, "attendance", event_id)?,
                comments: delete_chunked(tx.conn, "comments", event_id)?,
                feedback: delete_chunked(tx.conn, "event_feedback", event_id)?,
                insight_runs: delete_chunked(tx.conn, "insight_runs", event_id)?,
                analytics: tx
                    .conn
                    .execute("DELETE FROM event_analytics WHERE event_id = ?", [event_id])?,
                insights: tx
                    .conn
                    .execute("DELETE FROM ai_insights WHERE event_id = ?", [event_id])?,
            };
            tracing::info!(event_id, ?summary, "Purged event data");
            Ok(summary)
        })
    }
}

/// Read/write view over the store inside a transaction.
///
/// Exposes the subset of queries the aggregator needs while holding the
/// analytics row's write scope.
pub struct StoreTx<'a> {
    conn: &'a Connection,
}

impl<'a> StoreTx<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get an event by ID
    pub fn get_event(&self, id: &str) -> Result<Option<EventRecord>> {
        get_event(self.conn, id)
    }

    /// IDs of all events hosted by the given account
    pub fn event_ids_for_host(&self, host_uid: &str) -> Result<Vec<String>> {
        event_ids_for_host(self.conn, host_uid)
    }

    /// Get the analytics row for an event
    pub fn get_analytics(&self, event_id: &str) -> Result<Option<EventAnalytics>> {
        get_analytics(self.conn, event_id)
    }

    /// Merge-write the analytics row for an event
    pub fn put_analytics(&self, analytics: &EventAnalytics) -> Result<()> {
        let hourly = serde_json::to_string(&analytics.hourly_sign_ins)?;
        let feedback = analytics
            .feedback
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            r#"
            INSERT INTO event_analytics
                (event_id, total_attendees, hourly_sign_ins, repeat_attendees,
                 dropout_rate, feedback, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(event_id) DO UPDATE SET
                total_attendees = excluded.total_attendees,
                hourly_sign_ins = excluded.hourly_sign_ins,
                repeat_attendees = excluded.repeat_attendees,
                dropout_rate = excluded.dropout_rate,
                feedback = COALESCE(excluded.feedback, event_analytics.feedback),
                last_updated = excluded.last_updated
            "#,
            params![
                analytics.event_id,
                analytics.total_attendees,
                hourly,
                analytics.repeat_attendees,
                analytics.dropout_rate,
                feedback,
                analytics.last_updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Count of pre-registration placeholders for an event
    pub fn count_pre_registered(&self, event_id: &str) -> Result<i64> {
        count_pre_registered(self.conn, event_id)
    }

    /// Distinct events (within the given set, excluding one) this customer
    /// has attendance records for.
    pub fn distinct_events_attended(
        &self,
        customer_uid: &str,
        event_ids: &[String],
        exclude_event_id: &str,
    ) -> Result<i64> {
        if event_ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; event_ids.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(DISTINCT event_id) FROM attendance \
             WHERE customer_uid = ? AND event_id <> ? AND event_id IN ({placeholders})"
        );
        let params = std::iter::once(customer_uid)
            .chain(std::iter::once(exclude_event_id))
            .chain(event_ids.iter().map(|id| id.as_str()));
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count)
    }
}

// ============================================
// Shared helpers (usable inside and outside transactions)
// ============================================

fn upsert_event(conn: &Connection, event: &EventRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO events (id, title, host_uid, starts_at, location)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            host_uid = excluded.host_uid,
            starts_at = excluded.starts_at,
            location = excluded.location
        "#,
        params![
            event.id,
            event.title,
            event.host_uid,
            event.starts_at.to_rfc3339(),
            event.location,
        ],
    )?;
    Ok(())
}

fn get_event(conn: &Connection, id: &str) -> Result<Option<EventRecord>> {
    conn.query_row("SELECT * FROM events WHERE id = ?", [id], row_to_event)
        .optional()
        .map_err(Error::from)
}

fn event_ids_for_host(conn: &Connection, host_uid: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM events WHERE host_uid = ? ORDER BY id")?;
    let ids = stmt
        .query_map([host_uid], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

fn insert_attendance(conn: &Connection, record: &AttendanceRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO attendance (id, event_id, customer_uid, attended_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            record.id,
            record.event_id,
            record.customer.as_str(),
            record.attended_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn attendance_for_event(conn: &Connection, event_id: &str) -> Result<Vec<AttendanceRecord>> {
    let mut stmt =
        conn.prepare("SELECT * FROM attendance WHERE event_id = ? ORDER BY attended_at")?;
    let records = stmt
        .query_map([event_id], row_to_attendance)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

fn count_pre_registered(conn: &Connection, event_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE event_id = ?1 AND customer_uid = ?2",
        params![event_id, CustomerRef::PreRegistered.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn insert_comment(conn: &Connection, comment: &CommentRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO comments (id, event_id, author_uid, text, posted_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            comment.id,
            comment.event_id,
            comment.author_uid,
            comment.text,
            comment.posted_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn comments_for_event(conn: &Connection, event_id: &str) -> Result<Vec<CommentRecord>> {
    let mut stmt = conn.prepare("SELECT * FROM comments WHERE event_id = ? ORDER BY posted_at")?;
    let comments = stmt
        .query_map([event_id], row_to_comment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

fn get_analytics(conn: &Connection, event_id: &str) -> Result<Option<EventAnalytics>> {
    conn.query_row(
        "SELECT * FROM event_analytics WHERE event_id = ?",
        [event_id],
        row_to_analytics,
    )
    .optional()
    .map_err(Error::from)
}

fn delete_chunked(conn: &Connection, table: &str, event_id: &str) -> Result<usize> {
    let sql = format!(
        "DELETE FROM {table} WHERE rowid IN \
         (SELECT rowid FROM {table} WHERE event_id = ? LIMIT {PURGE_BATCH_SIZE})"
    );
    let mut total = 0;
    loop {
        let deleted = conn.execute(&sql, [event_id])?;
        total += deleted;
        if deleted < PURGE_BATCH_SIZE {
            break;
        }
    }
    Ok(total)
}

// ============================================
// Row mappers
// ============================================

fn row_to_event(row: &Row) -> rusqlite::Result<EventRecord> {
    let starts_at_str: String = row.get("starts_at")?;
    Ok(EventRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        host_uid: row.get("host_uid")?,
        starts_at: parse_utc(&starts_at_str),
        location: row.get("location")?,
    })
}

fn row_to_attendance(row: &Row) -> rusqlite::Result<AttendanceRecord> {
    let customer_uid: String = row.get("customer_uid")?;
    let attended_at_str: String = row.get("attended_at")?;
    Ok(AttendanceRecord {
        id: row.get("id")?,
        event_id: row.get("event_id")?,
        customer: CustomerRef::from_storage(&customer_uid),
        attended_at: DateTime::parse_from_rfc3339(&attended_at_str)
            .unwrap_or_else(|_| Utc::now().fixed_offset()),
    })
}

fn row_to_comment(row: &Row) -> rusqlite::Result<CommentRecord> {
    let posted_at_str: String = row.get("posted_at")?;
    Ok(CommentRecord {
        id: row.get("id")?,
        event_id: row.get("event_id")?,
        author_uid: row.get("author_uid")?,
        text: row.get("text")?,
        posted_at: parse_utc(&posted_at_str),
    })
}

fn row_to_analytics(row: &Row) -> rusqlite::Result<EventAnalytics> {
    let hourly_str: String = row.get("hourly_sign_ins")?;
    let feedback_str: Option<String> = row.get("feedback")?;
    let last_updated_str: String = row.get("last_updated")?;

    let hourly_sign_ins: BTreeMap<String, i64> =
        serde_json::from_str(&hourly_str).unwrap_or_default();

    Ok(EventAnalytics {
        event_id: row.get("event_id")?,
        total_attendees: row.get("total_attendees")?,
        hourly_sign_ins,
        repeat_attendees: row.get("repeat_attendees")?,
        dropout_rate: row.get("dropout_rate")?,
        feedback: feedback_str.and_then(|s| serde_json::from_str(&s).ok()),
        last_updated: parse_utc(&last_updated_str),
    })
}

fn row_to_insight_run(row: &Row) -> rusqlite::Result<InsightRun> {
    let started_at_str: String = row.get("started_at")?;
    let status_str: String = row.get("status")?;
    Ok(InsightRun {
        event_id: row.get("event_id")?,
        started_at: parse_utc(&started_at_str),
        duration_ms: row.get("duration_ms")?,
        status: InsightRunStatus::from_storage(&status_str),
        error_message: row.get("error_message")?,
    })
}

fn parse_utc(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
