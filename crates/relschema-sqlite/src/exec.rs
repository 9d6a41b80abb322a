//! The SQLite `Execer`: applies a changeset directly to a live database,
//! bypassing the migration-directory path. Used for ad-hoc "push this
//! diff now" flows rather than versioned migrations.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use relschema_core::{Changeset, Realm, SchemaChange, Table, TableChange};
use relschema_dialect::{DialectError, Execer, Inspector, PlanOptions, Planner, Result};
use rusqlite::Connection;

use crate::inspect::SqliteInspector;
use crate::plan::SqlitePlanner;

pub struct SqliteExecer {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecer {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Execer for SqliteExecer {
    async fn exec(&self, changes: &Changeset) -> Result<()> {
        let inspector = SqliteInspector::new(Arc::clone(&self.conn));
        let before = inspector
            .inspect(&relschema_dialect::InspectOptions::new())
            .await?;
        let after = apply_changeset(&before, changes).map_err(DialectError::Model)?;

        let planner = SqlitePlanner::new();
        let plan = planner.plan_changes(&PlanOptions::new("exec"), &before, &after, changes)?;

        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| exec_err("begin", 0, e))?;

        for (index, stmt) in plan.changes.iter().enumerate() {
            if let Err(e) = conn.execute_batch(&stmt.cmd) {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(DialectError::Exec {
                    context: "direct exec".to_string(),
                    index,
                    cause: Box::new(e),
                });
            }
        }

        conn.execute_batch("COMMIT").map_err(|e| exec_err("commit", 0, e))?;
        Ok(())
    }
}

fn exec_err(context: &'static str, index: usize, cause: rusqlite::Error) -> DialectError {
    DialectError::Exec {
        context: context.to_string(),
        index,
        cause: Box::new(cause),
    }
}

/// Applies a changeset to a realm snapshot in memory, producing the
/// resulting desired state. The inverse of diffing: where
/// `relschema_diff::diff_realms(a, b)` computes the changeset turning `a`
/// into `b`, `apply_changeset(a, changeset)` reconstructs (an equivalent
/// of) `b`.
pub fn apply_changeset(base: &Realm, changes: &Changeset) -> relschema_core::Result<Realm> {
    let mut realm = base.clone();
    // SQLite exposes a single implicit schema; anything addressed by name
    // without a schema lands in the first (and only) one.
    if realm.schemas.is_empty() {
        realm.schemas.push(relschema_core::Schema::new("main"));
    }

    for change in changes {
        match change {
            SchemaChange::AddSchema(schema) => realm.schemas.push(schema.clone()),
            SchemaChange::DropSchema(name) => realm.schemas.retain(|s| &s.name != name),
            SchemaChange::ModifySchema { .. } => {}
            SchemaChange::AddTable(table) => realm.schemas[0].tables.push(table.clone()),
            SchemaChange::DropTable(name) => {
                for schema in &mut realm.schemas {
                    schema.tables.retain(|t| &t.name != name);
                }
            }
            SchemaChange::ModifyTable { name, changes } => {
                for schema in &mut realm.schemas {
                    if let Some(table) = schema.tables.iter_mut().find(|t| &t.name == name) {
                        apply_table_changes(table, changes);
                    }
                }
            }
            SchemaChange::AddView(view) => realm.schemas[0].views.push(view.clone()),
            SchemaChange::DropView(name) => {
                for schema in &mut realm.schemas {
                    schema.views.retain(|v| &v.name != name);
                }
            }
            SchemaChange::ModifyView { name, to, .. } => {
                for schema in &mut realm.schemas {
                    if let Some(view) = schema.views.iter_mut().find(|v| &v.name == name) {
                        *view = to.clone();
                    }
                }
            }
            SchemaChange::RenameConstraint { .. } => {}
        }
    }

    realm.link()?;
    Ok(realm)
}

fn apply_table_changes(table: &mut Table, changes: &[TableChange]) {
    for change in changes {
        match change {
            TableChange::AddColumn(col) => table.columns.push(col.clone()),
            TableChange::DropColumn(name) => table.columns.retain(|c| &c.name != name),
            TableChange::ModifyColumn { name, to, .. } => {
                if let Some(col) = table.columns.iter_mut().find(|c| &c.name == name) {
                    *col = to.clone();
                }
            }
            TableChange::AddIndex(idx) => table.indexes.push(idx.clone()),
            TableChange::DropIndex(name) => table.indexes.retain(|i| &i.name != name),
            TableChange::ModifyIndex { name, to, .. } => {
                if let Some(idx) = table.indexes.iter_mut().find(|i| &i.name == name) {
                    *idx = to.clone();
                }
            }
            TableChange::AddForeignKey(fk) => table.foreign_keys.push(fk.clone()),
            TableChange::DropForeignKey(symbol) => {
                table.foreign_keys.retain(|f| &f.symbol != symbol)
            }
            TableChange::ModifyForeignKey { symbol, to, .. } => {
                if let Some(fk) = table.foreign_keys.iter_mut().find(|f| &f.symbol == symbol) {
                    *fk = to.clone();
                }
            }
            TableChange::AddCheck(check) => table.checks.push(check.clone()),
            TableChange::DropCheck(dropped) => match &dropped.name {
                Some(name) => table.checks.retain(|c| c.name.as_deref() != Some(name.as_str())),
                None => {
                    // Unnamed: remove one matching occurrence by
                    // expression, not every occurrence — duplicate
                    // unnamed checks are distinct constraints.
                    let mut removed = false;
                    table.checks.retain(|c| {
                        if !removed && c.name.is_none() && c.expression == dropped.expression {
                            removed = true;
                            false
                        } else {
                            true
                        }
                    });
                }
            },
            TableChange::AddAttr(attr) => table.attrs.push(attr.clone()),
            TableChange::DropAttr(attr) => table.attrs.retain(|a| a.tag() != attr.tag()),
            TableChange::ModifyAttr { to, .. } => {
                if let Some(attr) = table.attrs.iter_mut().find(|a| a.tag() == to.tag()) {
                    *attr = to.clone();
                }
            }
        }
    }
    let _ = table.link();
}
