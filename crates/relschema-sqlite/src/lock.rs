//! SQLite has no native advisory-lock primitive, unlike Postgres's
//! `pg_advisory_lock`. The driver fakes one with a dedicated lock table:
//! acquiring the lock is an `INSERT` guarded by a `UNIQUE` constraint on
//! the lock name, and releasing it is the matching `DELETE`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use relschema_dialect::{DialectError, LockGuard, LockTimeout, Locker, Result};
use rusqlite::Connection;

const LOCK_TABLE: &str = "_relschema_lock";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct SqliteLocker {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLocker {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn ensure_table(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {LOCK_TABLE} (name TEXT PRIMARY KEY, acquired_at TEXT NOT NULL)"
        ))
        .map_err(|e| exec_err("create lock table", e))?;
        Ok(())
    }

    fn try_acquire(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let result = conn.execute(
            &format!("INSERT INTO {LOCK_TABLE} (name, acquired_at) VALUES (?1, datetime('now'))"),
            [name],
        );
        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(exec_err("acquire lock", e)),
        }
    }

    fn release(&self, name: &str) {
        let conn = self.conn.lock();
        let _ = conn.execute(&format!("DELETE FROM {LOCK_TABLE} WHERE name = ?1"), [name]);
    }
}

#[async_trait]
impl Locker for SqliteLocker {
    async fn lock(&self, name: &str, timeout: LockTimeout) -> Result<Box<dyn LockGuard>> {
        self.ensure_table()?;

        let deadline = timeout.0.map(|d| Instant::now() + d);
        loop {
            if self.try_acquire(name)? {
                return Ok(Box::new(SqliteLockGuard {
                    conn: Arc::clone(&self.conn),
                    name: name.to_string(),
                }));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(DialectError::Locked { name: name.to_string() });
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

struct SqliteLockGuard {
    conn: Arc<Mutex<Connection>>,
    name: String,
}

impl LockGuard for SqliteLockGuard {}

impl Drop for SqliteLockGuard {
    fn drop(&mut self) {
        let locker = SqliteLocker { conn: Arc::clone(&self.conn) };
        locker.release(&self.name);
    }
}

fn exec_err(context: &'static str, cause: rusqlite::Error) -> DialectError {
    DialectError::Exec {
        context: context.to_string(),
        index: 0,
        cause: Box::new(cause),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two separate connections to the same on-disk file, the way two
    /// concurrent migration runs would contend for the lock. `:memory:`
    /// connections don't share state across `Connection` handles, so this
    /// needs a real file.
    fn connect(path: &std::path::Path) -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(Connection::open(path).unwrap()))
    }

    #[tokio::test]
    async fn second_locker_times_out_while_first_holds_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("locked.db");

        let first = SqliteLocker::new(connect(&db_path));
        let guard = first.lock("atlas_migrate", LockTimeout(None)).await.unwrap();

        let second = SqliteLocker::new(connect(&db_path));
        let result = second
            .lock("atlas_migrate", LockTimeout(Some(Duration::from_millis(150))))
            .await;
        assert!(matches!(result, Err(DialectError::Locked { .. })));

        drop(guard);
        second.lock("atlas_migrate", LockTimeout(Some(Duration::from_secs(1)))).await.unwrap();
    }
}
