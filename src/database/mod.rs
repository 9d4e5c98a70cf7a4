//! Audit log of user-data lookups, stored in SQLite.
//!
//! `rusqlite` is blocking, so every statement runs on Tokio's blocking pool
//! behind a mutex-guarded connection.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::debug;

use crate::BoxFuture;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS request_logs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    principal    TEXT NOT NULL,
    requested_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_request_logs_principal ON request_logs(principal);
";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Records which principals were looked up. Callers treat failures as non-fatal.
pub trait AuditLog: Send + Sync {
    fn record_principal<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, Result<(), AuditError>>;
}

/// One row of `request_logs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLog {
    pub id: i64,
    pub principal: String,
    pub requested_at: String,
}

#[derive(Clone)]
pub struct SqliteAuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditLog {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening audit database");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<RequestLog>, AuditError> {
        let conn = Arc::clone(&self.conn);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        tokio::task::spawn_blocking(move || -> Result<Vec<RequestLog>, AuditError> {
            let conn = conn.lock().map_err(|_| AuditError::Poisoned)?;
            let mut stmt = conn.prepare(
                "SELECT id, principal, requested_at FROM request_logs ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok(RequestLog {
                    id: row.get(0)?,
                    principal: row.get(1)?,
                    requested_at: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await?
    }
}

impl AuditLog for SqliteAuditLog {
    fn record_principal<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, Result<(), AuditError>> {
        let conn = Arc::clone(&self.conn);
        let principal = principal.to_owned();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || -> Result<(), AuditError> {
                let conn = conn.lock().map_err(|_| AuditError::Poisoned)?;
                conn.execute(
                    "INSERT INTO request_logs (principal) VALUES (?1)",
                    params![principal],
                )?;
                Ok(())
            })
            .await?
        })
    }
}
