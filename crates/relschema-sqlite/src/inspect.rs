//! The SQLite `Inspector`: reads `sqlite_master` plus the `PRAGMA`
//! introspection family into a dialect-neutral [`Realm`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use relschema_core::{
    Attribute, Check, Column, ForeignKey, Index, IndexPart, IndexPartKind, PrimaryKey,
    ReferenceAction, Realm, Schema, Table,
};
use relschema_dialect::{DialectError, InspectOptions, Inspector, Result};
use rusqlite::Connection;

use crate::parse;
use crate::types::{classify, parse_default_literal};

/// Reads schema state from a live SQLite connection. Holds the connection
/// behind a `Mutex` the same way the teacher's connection wrapper does,
/// since `rusqlite::Connection` is `!Sync`.
pub struct SqliteInspector {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInspector {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn list_table_names(&self, include_system: bool) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock();
        let sql = if include_system {
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY name"
        } else {
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        };
        let mut stmt = conn.prepare(sql).map_err(sql_err("sqlite_master"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?.unwrap_or_default()))
            })
            .map_err(sql_err("sqlite_master"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(sql_err("sqlite_master"))?);
        }
        Ok(out)
    }

    fn inspect_table(&self, name: &str, create_sql: &str) -> Result<Table> {
        let mut table = Table::new(name);

        table.columns = self.inspect_columns(name, create_sql)?;
        table.indexes = self.inspect_indexes(name)?;
        table.foreign_keys = self.inspect_foreign_keys(name, create_sql)?;
        table.checks = self.inspect_checks(create_sql);
        table.primary_key = self.inspect_primary_key(name, create_sql)?;

        if parse::is_without_rowid(create_sql) {
            table.attrs.push(Attribute::WithoutRowid);
        }
        if parse::is_strict(create_sql) {
            table.attrs.push(Attribute::Strict);
        }

        table.link().map_err(DialectError::Model)?;
        Ok(table)
    }

    fn inspect_columns(&self, table: &str, create_sql: &str) -> Result<Vec<Column>> {
        let conn = self.conn.lock();
        let sql = format!("PRAGMA table_info({})", quote(table));
        let mut stmt = conn.prepare(&sql).map_err(sql_err("table_info"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)? == 0,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(sql_err("table_info"))?;

        let generated = parse::parse_generated_columns(create_sql);
        let mut columns = Vec::new();
        for row in rows {
            let (name, declared_type, nullable, default_text, pk_rank) =
                row.map_err(sql_err("table_info"))?;

            let mut column = Column::new(&name, classify(&declared_type));
            column.nullable = nullable;
            column.default = default_text.as_deref().map(parse_default_literal);

            if pk_rank == 1 && declared_type.eq_ignore_ascii_case("integer") {
                column.attrs.push(Attribute::AutoIncrement);
            }
            if let Some(gen) = generated.iter().find(|g| g.column == name) {
                column.attrs.push(Attribute::Generated {
                    expression: gen.expression.clone(),
                    stored: gen.stored,
                });
            }

            columns.push(column);
        }
        Ok(columns)
    }

    fn inspect_indexes(&self, table: &str) -> Result<Vec<Index>> {
        let conn = self.conn.lock();
        let list_sql = format!("PRAGMA index_list({})", quote(table));
        let mut stmt = conn.prepare(&list_sql).map_err(sql_err("index_list"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? == 1,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(sql_err("index_list"))?;

        let mut indexes = Vec::new();
        for row in rows {
            let (name, unique, origin) = row.map_err(sql_err("index_list"))?;
            // Indexes implicitly created to back a PK/UNIQUE constraint
            // ("pk"/"u" origin) surface through PrimaryKey/the column's
            // UNIQUE attribute instead of as a standalone Index.
            if origin == "pk" {
                continue;
            }

            let info_sql = format!("PRAGMA index_info({})", quote(&name));
            let mut info_stmt = conn.prepare(&info_sql).map_err(sql_err("index_info"))?;
            let parts_rows = info_stmt
                .query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(2)?))
                })
                .map_err(sql_err("index_info"))?;

            let mut parts = Vec::new();
            for part in parts_rows {
                let (seq, col_name) = part.map_err(sql_err("index_info"))?;
                parts.push(IndexPart {
                    position: seq as u32,
                    descending: false,
                    kind: match col_name {
                        Some(c) => IndexPartKind::Column(c),
                        None => IndexPartKind::Expression("<expr>".to_string()),
                    },
                });
            }

            indexes.push(Index {
                name,
                unique,
                attrs: Vec::new(),
                parts,
            });
        }
        Ok(indexes)
    }

    fn inspect_foreign_keys(&self, table: &str, create_sql: &str) -> Result<Vec<ForeignKey>> {
        let conn = self.conn.lock();
        let sql = format!("PRAGMA foreign_key_list({})", quote(table));
        let mut stmt = conn.prepare(&sql).map_err(sql_err("foreign_key_list"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(sql_err("foreign_key_list"))?;

        // PRAGMA foreign_key_list groups rows by `id`; composite FKs emit
        // one row per column sharing the same id.
        use std::collections::BTreeMap;
        let mut by_id: BTreeMap<i64, (String, String, String, Vec<(String, String)>)> =
            BTreeMap::new();
        for row in rows {
            let (id, ref_table, from_col, to_col, on_update, on_delete) =
                row.map_err(sql_err("foreign_key_list"))?;
            let entry = by_id
                .entry(id)
                .or_insert_with(|| (ref_table.clone(), on_update.clone(), on_delete.clone(), Vec::new()));
            entry.3.push((from_col, to_col));
        }

        let named = parse::parse_named_foreign_keys(create_sql);
        // SQLite numbers `foreign_key_list` ids in reverse declaration
        // order; pairing reversed ids with declaration-order names
        // recovers the original symbol when one was given.
        let mut ids: Vec<i64> = by_id.keys().copied().collect();
        ids.sort_unstable();
        let mut foreign_keys = Vec::new();
        for (idx, id) in ids.iter().rev().enumerate() {
            let (ref_table, on_update, on_delete, cols) = by_id.remove(id).unwrap();
            let symbol = named
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("{table}_{ref_table}_{id}_fk"));
            foreign_keys.push(ForeignKey {
                symbol,
                columns: cols.iter().map(|(from, _)| from.clone()).collect(),
                ref_table,
                ref_columns: cols.iter().map(|(_, to)| to.clone()).collect(),
                on_update: parse_action(&on_update),
                on_delete: parse_action(&on_delete),
            });
        }
        Ok(foreign_keys)
    }

    fn inspect_checks(&self, create_sql: &str) -> Vec<Check> {
        parse::parse_checks(create_sql)
            .into_iter()
            .map(|c| Check { name: c.name, expression: c.expression })
            .collect()
    }

    fn inspect_primary_key(&self, table: &str, create_sql: &str) -> Result<Option<PrimaryKey>> {
        let conn = self.conn.lock();
        let sql = format!("PRAGMA table_info({})", quote(table));
        let mut stmt = conn.prepare(&sql).map_err(sql_err("table_info"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, i64>(5)?))
            })
            .map_err(sql_err("table_info"))?;

        let mut parts: Vec<(i64, String)> = Vec::new();
        for row in rows {
            let (name, rank) = row.map_err(sql_err("table_info"))?;
            if rank > 0 {
                parts.push((rank, name));
            }
        }
        if parts.is_empty() {
            return Ok(None);
        }
        parts.sort_by_key(|(rank, _)| *rank);

        Ok(Some(PrimaryKey {
            name: parse::parse_named_primary_key(create_sql),
            attrs: Vec::new(),
            parts: parts.into_iter().map(|(_, name)| name).collect(),
        }))
    }
}

#[async_trait]
impl Inspector for SqliteInspector {
    async fn inspect(&self, opts: &InspectOptions) -> Result<Realm> {
        let include_system = opts.include_system;
        let table_names = self.list_table_names(include_system)?;
        tracing::debug!(tables = table_names.len(), include_system, "inspecting schema");

        let mut schema = Schema::new("main");
        for (name, create_sql) in &table_names {
            schema.tables.push(self.inspect_table(name, create_sql)?);
        }

        let mut realm = Realm {
            schemas: vec![schema],
        };
        realm.link().map_err(DialectError::Model)?;
        Ok(realm)
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn parse_action(raw: &str) -> ReferenceAction {
    match raw.to_uppercase().as_str() {
        "CASCADE" => ReferenceAction::Cascade,
        "SET NULL" => ReferenceAction::SetNull,
        "SET DEFAULT" => ReferenceAction::SetDefault,
        "RESTRICT" => ReferenceAction::Restrict,
        _ => ReferenceAction::NoAction,
    }
}

fn sql_err(context: &'static str) -> impl Fn(rusqlite::Error) -> DialectError {
    move |e| DialectError::Exec {
        context: context.to_string(),
        index: 0,
        cause: Box::new(e),
    }
}
