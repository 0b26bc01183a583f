//! SQLite-backed probe record storage

#![allow(clippy::significant_drop_tightening)] // Lock guards held across DB operations

use crate::{CoreError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use schema::{AggregateSnapshot, ProbeRecord};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// SQL schema for the probe database.
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pod TEXT NOT NULL,
    ts DATETIME NOT NULL,
    payload TEXT
);
";

/// Count plus the latest row, read in one statement so both halves come from
/// the same snapshot of the table.
const SNAPSHOT_QUERY: &str = r"
SELECT COUNT(*),
    (SELECT id FROM entries ORDER BY id DESC LIMIT 1),
    (SELECT pod FROM entries ORDER BY id DESC LIMIT 1),
    (SELECT ts FROM entries ORDER BY id DESC LIMIT 1),
    (SELECT payload FROM entries ORDER BY id DESC LIMIT 1)
FROM entries
";

/// Trait for probe storage operations.
#[async_trait]
pub trait ProbeStore: Send + Sync {
    /// Append one record and return its store-assigned id.
    async fn insert(&self, pod: &str, payload: &str) -> Result<i64>;

    /// Count all records and fetch the most recent one.
    async fn snapshot(&self) -> Result<AggregateSnapshot>;
}

/// SQLite-backed probe storage.
#[derive(Clone)]
pub struct SqliteProbeStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteProbeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProbeStore").finish()
    }
}

impl SqliteProbeStore {
    /// Opens or creates the probe database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InitializationError`] if the database cannot be
    /// opened or the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            CoreError::InitializationError(format!("can not open sqlite db {}: {e}", path.display()))
        })?;
        let store = Self::with_schema(conn)?;
        info!("Probe database opened at {:?}", path);
        Ok(store)
    }

    /// Opens an in-memory database for testing.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::InitializationError(format!("can not open sqlite db: {e}")))?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| CoreError::InitializationError(format!("can not create schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl ProbeStore for SqliteProbeStore {
    async fn insert(&self, pod: &str, payload: &str) -> Result<i64> {
        let pod = pod.to_string();
        let payload = payload.to_string();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO entries (pod, ts, payload) VALUES (?1, datetime('now'), ?2)",
                params![pod, payload],
            )?;
            Ok::<i64, CoreError>(conn.last_insert_rowid())
        })
        .await?
    }

    async fn snapshot(&self) -> Result<AggregateSnapshot> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let snapshot = conn.query_row(SNAPSHOT_QUERY, [], |row| {
                let count: i64 = row.get(0)?;
                let id: Option<i64> = row.get(1)?;
                let latest = match id {
                    Some(id) => Some(ProbeRecord {
                        id,
                        pod: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        ts: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        payload: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    }),
                    None => None,
                };
                Ok(AggregateSnapshot {
                    count: u64::try_from(count).unwrap_or_default(),
                    latest,
                })
            })?;
            Ok::<AggregateSnapshot, CoreError>(snapshot)
        })
        .await?
    }
}
