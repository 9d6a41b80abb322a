//! Tracks which migration versions have already been applied to a target
//! database, the way `zqlz-versioning`'s `VersionStorage` tracks object
//! version history — except the rows here describe migration runs, not
//! saved object bodies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::{ExecError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub version: String,
    pub description: String,
    pub applied: usize,
    pub total: usize,
    pub hash: String,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub execution_time_ms: i64,
}

#[async_trait]
pub trait RevisionStore: Send + Sync {
    async fn read_revisions(&self) -> Result<Vec<Revision>>;
    async fn write_revision(&self, revision: &Revision) -> Result<()>;
    async fn delete_revision(&self, version: &str) -> Result<()>;
}

/// A `rusqlite`-backed revision store. Stores one row per migration file
/// ever attempted, including failed/partial attempts, in its own table —
/// callers typically point this at the same database being migrated, or
/// a side-car file, per `spec.md` §6's "revision store contract" being
/// external to the target connection.
pub struct SqliteRevisionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRevisionStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Result<Self> {
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _relschema_revisions (
                version TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                applied INTEGER NOT NULL,
                total INTEGER NOT NULL,
                hash TEXT NOT NULL,
                error TEXT,
                executed_at TEXT NOT NULL,
                execution_time_ms INTEGER NOT NULL
            )",
        )
        .map_err(|e| ExecError::Revision(e.to_string()))
    }
}

#[async_trait]
impl RevisionStore for SqliteRevisionStore {
    async fn read_revisions(&self) -> Result<Vec<Revision>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT version, description, applied, total, hash, error, executed_at, execution_time_ms
                 FROM _relschema_revisions ORDER BY version ASC",
            )
            .map_err(|e| ExecError::Revision(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let executed_at: String = row.get(6)?;
                Ok(Revision {
                    version: row.get(0)?,
                    description: row.get(1)?,
                    applied: row.get::<_, i64>(2)? as usize,
                    total: row.get::<_, i64>(3)? as usize,
                    hash: row.get(4)?,
                    error: row.get(5)?,
                    executed_at: parse_datetime(&executed_at),
                    execution_time_ms: row.get(7)?,
                })
            })
            .map_err(|e| ExecError::Revision(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ExecError::Revision(e.to_string()))?;

        Ok(rows)
    }

    async fn write_revision(&self, revision: &Revision) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO _relschema_revisions
                (version, description, applied, total, hash, error, executed_at, execution_time_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(version) DO UPDATE SET
                description = excluded.description,
                applied = excluded.applied,
                total = excluded.total,
                hash = excluded.hash,
                error = excluded.error,
                executed_at = excluded.executed_at,
                execution_time_ms = excluded.execution_time_ms",
            params![
                revision.version,
                revision.description,
                revision.applied as i64,
                revision.total as i64,
                revision.hash,
                revision.error,
                revision.executed_at.to_rfc3339(),
                revision.execution_time_ms,
            ],
        )
        .map_err(|e| ExecError::Revision(e.to_string()))?;
        Ok(())
    }

    async fn delete_revision(&self, version: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM _relschema_revisions WHERE version = ?1",
            params![version],
        )
        .map_err(|e| ExecError::Revision(e.to_string()))?;
        Ok(())
    }
}

/// A `RevisionStore` backed by a plain in-process `Vec`, no file or
/// connection involved. Used by the analyzer hook's dev-DB replay (where
/// persisting applied-version state across runs is meaningless — the
/// sandbox DB is thrown away) and by tests that want a store without a
/// SQLite schema bootstrap.
#[derive(Default)]
pub struct InMemoryRevisionStore {
    revisions: Mutex<Vec<Revision>>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevisionStore for InMemoryRevisionStore {
    async fn read_revisions(&self) -> Result<Vec<Revision>> {
        let mut revisions = self.revisions.lock().clone();
        revisions.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(revisions)
    }

    async fn write_revision(&self, revision: &Revision) -> Result<()> {
        let mut revisions = self.revisions.lock();
        if let Some(existing) = revisions.iter_mut().find(|r| r.version == revision.version) {
            *existing = revision.clone();
        } else {
            revisions.push(revision.clone());
        }
        Ok(())
    }

    async fn delete_revision(&self, version: &str) -> Result<()> {
        self.revisions.lock().retain(|r| r.version != version);
        Ok(())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteRevisionStore {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        SqliteRevisionStore::new(conn).unwrap()
    }

    fn sample(version: &str) -> Revision {
        Revision {
            version: version.to_string(),
            description: "init".to_string(),
            applied: 3,
            total: 3,
            hash: "h1:abc".to_string(),
            error: None,
            executed_at: Utc::now(),
            execution_time_ms: 12,
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = store();
        store.write_revision(&sample("20260101000000")).await.unwrap();

        let revisions = store.read_revisions().await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].version, "20260101000000");
        assert_eq!(revisions[0].applied, 3);
    }

    #[tokio::test]
    async fn delete_removes_revision() {
        let store = store();
        store.write_revision(&sample("20260101000000")).await.unwrap();
        store.delete_revision("20260101000000").await.unwrap();

        assert!(store.read_revisions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn revisions_read_in_version_order() {
        let store = store();
        store.write_revision(&sample("20260102000000")).await.unwrap();
        store.write_revision(&sample("20260101000000")).await.unwrap();

        let revisions = store.read_revisions().await.unwrap();
        assert_eq!(revisions[0].version, "20260101000000");
        assert_eq!(revisions[1].version, "20260102000000");
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_and_orders() {
        let store = InMemoryRevisionStore::new();
        store.write_revision(&sample("20260102000000")).await.unwrap();
        store.write_revision(&sample("20260101000000")).await.unwrap();

        let revisions = store.read_revisions().await.unwrap();
        assert_eq!(revisions[0].version, "20260101000000");
        assert_eq!(revisions[1].version, "20260102000000");

        store.delete_revision("20260101000000").await.unwrap();
        assert_eq!(store.read_revisions().await.unwrap().len(), 1);
    }
}
