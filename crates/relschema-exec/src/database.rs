//! Minimal raw-SQL execution surface the executor needs against a target
//! database: begin/execute/commit/rollback. Kept separate from
//! `relschema_dialect::Execer` (which applies typed changesets) because
//! the executor applies *migration file text*, not changesets.

use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::{ExecError, Result};

pub trait DatabaseHandle: Send + Sync {
    fn begin(&self) -> Result<()>;
    fn execute(&self, stmt: &str) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

pub struct SqliteHandle {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHandle {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl DatabaseHandle for SqliteHandle {
    fn begin(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| ExecError::Database(e.to_string()))
    }

    fn execute(&self, stmt: &str) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(stmt)
            .map_err(|e| ExecError::Database(e.to_string()))
    }

    fn commit(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch("COMMIT")
            .map_err(|e| ExecError::Database(e.to_string()))
    }

    fn rollback(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch("ROLLBACK")
            .map_err(|e| ExecError::Database(e.to_string()))
    }
}
