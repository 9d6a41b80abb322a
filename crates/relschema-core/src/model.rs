//! The schema model: a graph of value-typed entities produced by
//! inspection (or an HCL-style desired-state reader) and consumed by the
//! diff engine and planner. Models are immutable snapshots once built —
//! nothing downstream mutates them in place.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::types::{ColumnDefault, ColumnType};

/// Top-level container grouping one or more schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Realm {
    pub schemas: Vec<Schema>,
}

impl Realm {
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.iter_mut().find(|s| s.name == name)
    }

    pub fn require_schema(&self, name: &str) -> Result<&Schema> {
        self.schema(name)
            .ok_or_else(|| ModelError::SchemaNotFound(name.to_string()))
    }

    /// Links derived back-references (column -> foreign keys it
    /// participates in) after the realm has been fully built. Inspection
    /// and desired-state readers call this once, as the final construction
    /// step; nothing mutates the model after.
    pub fn link(&mut self) -> Result<()> {
        for schema in &mut self.schemas {
            for table in &mut schema.tables {
                table.link()?;
            }
        }
        Ok(())
    }
}

/// A named container of tables/views within a realm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }
}

/// A table: columns, indexes, foreign keys, checks, and at most one
/// primary key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<Check>,
    pub primary_key: Option<PrimaryKey>,
    /// Names of tables this table's declared foreign keys depend on, used
    /// by the migration planner's dependency ordering.
    pub declared_deps: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn foreign_key(&self, symbol: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|f| f.symbol == symbol)
    }

    /// Validates invariants and links each column's `foreign_keys`
    /// back-reference from the table's forward `foreign_keys` list.
    pub fn link(&mut self) -> Result<()> {
        self.declared_deps.clear();
        for fk in &self.foreign_keys {
            if fk.columns.len() != fk.ref_columns.len() {
                return Err(ModelError::ForeignKeyColumnMismatch {
                    table: self.name.clone(),
                    symbol: fk.symbol.clone(),
                    local: fk.columns.len(),
                    referenced: fk.ref_columns.len(),
                });
            }
            for col in &fk.columns {
                if self.column(col).is_none() {
                    return Err(ModelError::ColumnNotFound {
                        table: self.name.clone(),
                        column: col.clone(),
                    });
                }
            }
            if fk.ref_table != self.name && !self.declared_deps.contains(&fk.ref_table) {
                self.declared_deps.push(fk.ref_table.clone());
            }
        }

        for index in &self.indexes {
            if index.parts.is_empty() {
                return Err(ModelError::EmptyIndex {
                    table: self.name.clone(),
                    index: index.name.clone(),
                });
            }
            for part in &index.parts {
                if let IndexPartKind::Column(col) = &part.kind {
                    if self.column(col).is_none() {
                        return Err(ModelError::ColumnNotFound {
                            table: self.name.clone(),
                            column: col.clone(),
                        });
                    }
                }
            }
        }

        if let Some(pk) = &self.primary_key {
            if pk.parts.is_empty() {
                return Err(ModelError::InvalidPrimaryKey(self.name.clone()));
            }
            for col in &pk.parts {
                if self.column(col).is_none() {
                    return Err(ModelError::ColumnNotFound {
                        table: self.name.clone(),
                        column: col.clone(),
                    });
                }
            }
        }

        for col in &mut self.columns {
            col.foreign_keys = self
                .foreign_keys
                .iter()
                .filter(|fk| fk.columns.contains(&col.name))
                .map(|fk| fk.symbol.clone())
                .collect();
        }

        Ok(())
    }

    /// Returns true if this table's primary key is a single auto-increment
    /// integer column, the case SQLite requires to inline
    /// `PRIMARY KEY AUTOINCREMENT` on the column definition.
    pub fn has_inline_autoincrement_pk(&self) -> bool {
        matches!(&self.primary_key, Some(pk) if pk.parts.len() == 1)
            && self.primary_key.as_ref().is_some_and(|pk| {
                self.column(&pk.parts[0])
                    .is_some_and(|c| c.attrs.iter().any(|a| matches!(a, Attribute::AutoIncrement)))
            })
    }
}

/// A view: a named, dialect-specific `SELECT` definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub definition: String,
    pub check_option: ViewCheckOption,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub declared_deps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewCheckOption {
    #[default]
    None,
    Local,
    Cascaded,
}

/// A table or view column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub nullable: bool,
    pub ty: ColumnType,
    pub default: Option<ColumnDefault>,
    pub attrs: Vec<Attribute>,
    /// Symbols of foreign keys this column participates in. Derived by
    /// [`Table::link`]; never set directly by a constructor.
    #[serde(default)]
    pub foreign_keys: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            ty,
            default: None,
            attrs: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// A single indexed column or expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPart {
    pub position: u32,
    pub descending: bool,
    pub kind: IndexPartKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexPartKind {
    Column(String),
    Expression(String),
}

/// A table or view index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub attrs: Vec<Attribute>,
    pub parts: Vec<IndexPart>,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            attrs: Vec::new(),
            parts: Vec::new(),
        }
    }
}

/// A table's primary key: a unique index with at least one part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub attrs: Vec<Attribute>,
    pub parts: Vec<String>,
}

/// Referential action taken on update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl Default for ReferenceAction {
    /// Empty on-update/on-delete text is treated as `NO ACTION`, the
    /// per-dialect default this spec documents for foreign-key pairing.
    fn default() -> Self {
        ReferenceAction::NoAction
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub symbol: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_update: ReferenceAction,
    pub on_delete: ReferenceAction,
}

/// A CHECK constraint. `name` is `None` when the constraint was declared
/// without a `CONSTRAINT <name>` clause — SQLite assigns it no stable
/// identity of its own, so it must never be synthesized by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub name: Option<String>,
    pub expression: String,
}

/// Open-ended attribute attachment. Dialects register their own tags;
/// unrecognized tags crossing a boundary (e.g. from inspection) are
/// preserved as `DialectSpecific` so round-tripping never loses
/// information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Comment(String),
    Charset(String),
    Collation(String),
    Generated { expression: String, stored: bool },
    Check(String),
    RawExpr(String),
    AutoIncrement,
    WithoutRowid,
    Strict,
    DialectSpecific { tag: String, payload: String },
}

impl Attribute {
    /// Returns the tag used for presence queries in attribute diffing,
    /// independent of payload.
    pub fn tag(&self) -> &str {
        match self {
            Attribute::Comment(_) => "comment",
            Attribute::Charset(_) => "charset",
            Attribute::Collation(_) => "collation",
            Attribute::Generated { .. } => "generated",
            Attribute::Check(_) => "check",
            Attribute::RawExpr(_) => "raw_expr",
            Attribute::AutoIncrement => "auto_increment",
            Attribute::WithoutRowid => "without_rowid",
            Attribute::Strict => "strict",
            Attribute::DialectSpecific { tag, .. } => tag.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    /// The model is the wire shape for a desired-state reader (e.g. an
    /// HCL evaluator feeding a `Realm` in) as well as inspection's output,
    /// so a realm has to survive a JSON round trip losslessly.
    #[test]
    fn realm_round_trips_through_json() {
        let mut table = Table::new("users");
        table.columns.push(Column::new(
            "id",
            ColumnType::Integer { width: Some(64), unsigned: false },
        ));
        table.primary_key = Some(PrimaryKey {
            name: None,
            attrs: vec![],
            parts: vec!["id".to_string()],
        });
        table.link().unwrap();

        let mut realm = Realm::default();
        let mut schema = Schema::new("main");
        schema.tables.push(table);
        realm.schemas.push(schema);

        let json = serde_json::to_string(&realm).unwrap();
        let decoded: Realm = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.schemas.len(), 1);
        assert_eq!(decoded.schemas[0].tables[0].name, "users");
        assert_eq!(decoded.schemas[0].tables[0].columns[0].name, "id");
    }
}
