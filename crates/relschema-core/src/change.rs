//! The change algebra: the closed set of change variants the diff engine
//! produces and the migration planner consumes.

use enumflags2::{bitflags, BitFlags};
use serde::{Deserialize, Serialize};

use crate::model::{Check, Column, ForeignKey, Index, Schema, Table, View};

/// Bits describing *what* changed about a column, index, or foreign key
/// between two schema states. A single shared mask — only the bits
/// relevant to the entity kind are ever set — lets downstream components
/// make coarse decisions (e.g. "this needs a table rebuild") without
/// re-diffing the entity.
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeBit {
    Null,
    Type,
    Default,
    Comment,
    Charset,
    Collation,
    Generated,
    Unique,
    Parts,
    RefColumn,
    RefTable,
    Action,
}

pub type ChangeMask = BitFlags<ChangeBit>;

/// A single change within a `ModifyTable`. Variants are ordered by the
/// diff engine as columns, then indexes, then foreign keys, then checks,
/// then attributes (`spec.md` §4.3) — this order is observable: the
/// planner's SQLite rebuild procedure relies on it and must not reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableChange {
    AddColumn(Column),
    DropColumn(String),
    ModifyColumn {
        name: String,
        from: Column,
        to: Column,
        mask: ChangeMask,
    },
    AddIndex(Index),
    DropIndex(String),
    ModifyIndex {
        name: String,
        from: Index,
        to: Index,
        mask: ChangeMask,
    },
    AddForeignKey(ForeignKey),
    DropForeignKey(String),
    ModifyForeignKey {
        symbol: String,
        from: ForeignKey,
        to: ForeignKey,
        mask: ChangeMask,
    },
    AddCheck(Check),
    /// Carries the full dropped `Check`, not just a name: an unnamed
    /// check has nothing to identify it by but its expression.
    DropCheck(Check),
    AddAttr(crate::model::Attribute),
    DropAttr(crate::model::Attribute),
    ModifyAttr {
        from: crate::model::Attribute,
        to: crate::model::Attribute,
    },
}

impl TableChange {
    /// True for changes SQLite can express as a simple `ALTER TABLE ...
    /// ADD COLUMN` / `CREATE INDEX` / `DROP INDEX`, i.e. changes that do
    /// *not* require the temp-table rebuild procedure.
    pub fn is_sqlite_inline(&self) -> bool {
        matches!(
            self,
            TableChange::AddColumn(_) | TableChange::AddIndex(_) | TableChange::DropIndex(_)
        )
    }
}

/// A top-level schema change, as produced by the diff engine and consumed
/// by the migration planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchemaChange {
    AddSchema(Schema),
    DropSchema(String),
    ModifySchema {
        name: String,
        attr_changes: Vec<TableChange>,
    },
    AddTable(Table),
    DropTable(String),
    ModifyTable {
        name: String,
        changes: Vec<TableChange>,
    },
    AddView(View),
    DropView(String),
    ModifyView {
        name: String,
        from: View,
        to: View,
    },
    RenameConstraint {
        table: String,
        from: String,
        to: String,
    },
}

impl SchemaChange {
    /// The name of the primary entity this change targets, used for
    /// dependency ordering and conflict detection.
    pub fn target_name(&self) -> &str {
        match self {
            SchemaChange::AddSchema(s) => &s.name,
            SchemaChange::DropSchema(n) => n,
            SchemaChange::ModifySchema { name, .. } => name,
            SchemaChange::AddTable(t) => &t.name,
            SchemaChange::DropTable(n) => n,
            SchemaChange::ModifyTable { name, .. } => name,
            SchemaChange::AddView(v) => &v.name,
            SchemaChange::DropView(n) => n,
            SchemaChange::ModifyView { name, .. } => name,
            SchemaChange::RenameConstraint { table, .. } => table,
        }
    }
}

/// An ordered list of changes, the direct output of the diff engine.
pub type Changeset = Vec<SchemaChange>;

/// A single planned SQL statement, paired with its reverse when one can be
/// safely derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStatement {
    pub cmd: String,
    pub reverse: Option<String>,
    pub comment: Option<String>,
}

impl PlannedStatement {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            reverse: None,
            comment: None,
        }
    }

    pub fn with_reverse(mut self, reverse: impl Into<String>) -> Self {
        self.reverse = Some(reverse.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// An ordered, reversible-where-possible plan derived from a changeset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub transactional: bool,
    pub changes: Vec<PlannedStatement>,
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transactional: true,
            changes: Vec::new(),
        }
    }

    /// A plan is reversible only if every statement in it has a reverse.
    pub fn reversible(&self) -> bool {
        !self.changes.is_empty() && self.changes.iter().all(|c| c.reverse.is_some())
    }

    pub fn push(&mut self, stmt: PlannedStatement) {
        self.changes.push(stmt);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
