use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One telemetry row. Every dispatched request produces exactly one,
/// success or failure; translation errors never reach this layer.
#[derive(Debug, Clone)]
pub struct RequestLogRow {
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub account_name: String,
    /// Client-supplied model label.
    pub model: String,
    /// Resolved upstream model identifier.
    pub model_id: String,
    pub conversation_id: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Telemetry collaborator. Insertion order across requests is not
/// guaranteed and not required.
pub trait LogSink: Send + Sync {
    fn insert_log(&self, row: &RequestLogRow) -> Result<(), LogError>;
}

/// SQLite-backed sink. Thread-safe: the connection sits behind a Mutex and
/// each insert is a single short statement.
pub struct SqliteLogSink {
    db: Mutex<Connection>,
}

impl SqliteLogSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let conn = Connection::open(path)?;
        db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, LogError> {
        let conn = Connection::open_in_memory()?;
        db::init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Most recent rows, newest first. Used by the admin surface and tests.
    pub fn recent(&self, limit: usize) -> Result<Vec<RequestLogRow>, LogError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT created_at, account_id, account_name, model, model_id,
                    conversation_id, success, status_code, error, duration_ms
             FROM request_logs
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            let created_at: String = row.get(0)?;
            let status_code: Option<i64> = row.get(7)?;
            Ok(RequestLogRow {
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
                account_id: row.get(1)?,
                account_name: row.get(2)?,
                model: row.get(3)?,
                model_id: row.get(4)?,
                conversation_id: row.get(5)?,
                success: row.get::<_, i64>(6)? != 0,
                status_code: status_code.map(|c| c as u16),
                error: row.get(8)?,
                duration_ms: row.get::<_, i64>(9)? as u64,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

impl LogSink for SqliteLogSink {
    fn insert_log(&self, row: &RequestLogRow) -> Result<(), LogError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO request_logs
             (created_at, account_id, account_name, model, model_id,
              conversation_id, success, status_code, error, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                row.created_at.to_rfc3339(),
                row.account_id,
                row.account_name,
                row.model,
                row.model_id,
                row.conversation_id,
                row.success,
                row.status_code,
                row.error,
                row.duration_ms as i64,
            ],
        )?;
        Ok(())
    }
}
