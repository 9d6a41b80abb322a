//! The dialect-agnostic diff engine frame.

use std::collections::HashMap;

use relschema_core::{
    Attribute, ChangeBit, ChangeMask, Changeset, Column, ForeignKey, Index, IndexPart, Realm,
    Schema, SchemaChange, Table, TableChange, View,
};

use crate::config::DiffConfig;
use crate::driver::DiffDriver;
use crate::error::{DiffError, Result};

/// Computes the changeset that migrates `left` to `right`.
///
/// Round-trip idempotence holds by construction: every step below only
/// emits a change when it finds an actual difference, so `diff(r, r)` walks
/// every pairing, finds none, and returns an empty changeset.
pub fn diff_realms(
    left: &Realm,
    right: &Realm,
    driver: &dyn DiffDriver,
    config: &DiffConfig,
) -> Result<Changeset> {
    let mut changes = Vec::new();

    let left_by_name: HashMap<&str, &Schema> =
        left.schemas.iter().map(|s| (s.name.as_str(), s)).collect();
    let right_by_name: HashMap<&str, &Schema> = right
        .schemas
        .iter()
        .map(|s| (s.name.as_str(), s))
        .collect();

    for schema in &right.schemas {
        if !left_by_name.contains_key(schema.name.as_str()) {
            changes.push(SchemaChange::AddSchema(schema.clone()));
        }
    }
    for schema in &left.schemas {
        if !right_by_name.contains_key(schema.name.as_str()) {
            changes.push(SchemaChange::DropSchema(schema.name.clone()));
        }
    }
    for (name, left_schema) in &left_by_name {
        if let Some(right_schema) = right_by_name.get(name) {
            diff_schema(left_schema, right_schema, driver, config, &mut changes)?;
        }
    }

    Ok(changes)
}

fn diff_schema(
    left: &Schema,
    right: &Schema,
    driver: &dyn DiffDriver,
    config: &DiffConfig,
    out: &mut Changeset,
) -> Result<()> {
    let left_tables: HashMap<&str, &Table> =
        left.tables.iter().map(|t| (t.name.as_str(), t)).collect();
    let right_tables: HashMap<&str, &Table> = right
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();

    for table in &right.tables {
        if !left_tables.contains_key(table.name.as_str()) {
            out.push(SchemaChange::AddTable(table.clone()));
        }
    }
    for table in &left.tables {
        if !right_tables.contains_key(table.name.as_str()) {
            out.push(SchemaChange::DropTable(table.name.clone()));
        }
    }
    for (name, left_table) in &left_tables {
        if let Some(right_table) = right_tables.get(name) {
            if let Some(changes) = diff_table(left_table, right_table, driver, config)? {
                out.push(SchemaChange::ModifyTable {
                    name: name.to_string(),
                    changes,
                });
            }
        }
    }

    if config.compare_views {
        let left_views: HashMap<&str, &View> =
            left.views.iter().map(|v| (v.name.as_str(), v)).collect();
        let right_views: HashMap<&str, &View> =
            right.views.iter().map(|v| (v.name.as_str(), v)).collect();

        for view in &right.views {
            if !left_views.contains_key(view.name.as_str()) {
                out.push(SchemaChange::AddView(view.clone()));
            }
        }
        for view in &left.views {
            if !right_views.contains_key(view.name.as_str()) {
                out.push(SchemaChange::DropView(view.name.clone()));
            }
        }
        for (name, left_view) in &left_views {
            if let Some(right_view) = right_views.get(name) {
                if left_view.definition != right_view.definition
                    || left_view.check_option != right_view.check_option
                {
                    out.push(SchemaChange::ModifyView {
                        name: name.to_string(),
                        from: (*left_view).clone(),
                        to: (*right_view).clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Diffs a single table pair. Returns `None` when the tables are
/// equivalent (no `ModifyTable` should be emitted).
fn diff_table(
    left: &Table,
    right: &Table,
    driver: &dyn DiffDriver,
    config: &DiffConfig,
) -> Result<Option<Vec<TableChange>>> {
    driver.check_primary_key_change(
        &left.name,
        left.primary_key.as_ref(),
        right.primary_key.as_ref(),
    )?;

    let mut changes = Vec::new();

    diff_columns(left, right, driver, &mut changes)?;
    if config.compare_indexes {
        diff_indexes(left, right, driver, &mut changes);
    }
    if config.compare_foreign_keys {
        diff_foreign_keys(left, right, driver, &mut changes);
    }
    if config.compare_checks {
        diff_checks(left, right, &mut changes);
    }
    if config.compare_attrs {
        diff_attrs(&left.attrs, &right.attrs, driver, &mut changes);
    }

    if changes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(changes))
    }
}

fn find_attr<'a>(attrs: &'a [Attribute], tag: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|a| a.tag() == tag)
}

fn diff_columns(
    left: &Table,
    right: &Table,
    driver: &dyn DiffDriver,
    out: &mut Vec<TableChange>,
) -> Result<()> {
    let mut seen = std::collections::HashSet::new();

    let left_cols: HashMap<&str, &Column> =
        left.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let right_cols: HashMap<&str, &Column> = right
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    for col in &right.columns {
        if !left_cols.contains_key(col.name.as_str()) {
            if !seen.insert(col.name.clone()) {
                return Err(DiffError::ConflictingColumnChange {
                    table: left.name.clone(),
                    column: col.name.clone(),
                });
            }
            out.push(TableChange::AddColumn(col.clone()));
        }
    }
    for col in &left.columns {
        if !right_cols.contains_key(col.name.as_str()) {
            if !seen.insert(col.name.clone()) {
                return Err(DiffError::ConflictingColumnChange {
                    table: left.name.clone(),
                    column: col.name.clone(),
                });
            }
            out.push(TableChange::DropColumn(col.name.clone()));
        }
    }
    for col in &left.columns {
        if let Some(right_col) = right_cols.get(col.name.as_str()) {
            if let Some(mask) = diff_column(col, right_col, driver) {
                if !seen.insert(col.name.clone()) {
                    return Err(DiffError::ConflictingColumnChange {
                        table: left.name.clone(),
                        column: col.name.clone(),
                    });
                }
                out.push(TableChange::ModifyColumn {
                    name: col.name.clone(),
                    from: col.clone(),
                    to: (*right_col).clone(),
                    mask,
                });
            }
        }
    }
    Ok(())
}

fn diff_column(left: &Column, right: &Column, driver: &dyn DiffDriver) -> Option<ChangeMask> {
    let mut mask = ChangeMask::empty();

    if left.nullable != right.nullable {
        mask |= ChangeBit::Null;
    }
    if !driver.types_equivalent(&left.ty, &right.ty) {
        mask |= ChangeBit::Type;
    }
    if !driver.defaults_equivalent(left.default.as_ref(), right.default.as_ref()) {
        mask |= ChangeBit::Default;
    }

    for (tag, bit) in [
        ("comment", ChangeBit::Comment),
        ("charset", ChangeBit::Charset),
        ("collation", ChangeBit::Collation),
        ("generated", ChangeBit::Generated),
    ] {
        let l = find_attr(&left.attrs, tag);
        let r = find_attr(&right.attrs, tag);
        let differs = match (l, r) {
            (Some(l), Some(r)) => !driver.attrs_equivalent(l, r),
            (None, None) => false,
            _ => true,
        };
        if differs {
            mask |= bit;
        }
    }

    if mask.is_empty() {
        None
    } else {
        Some(mask)
    }
}

fn diff_indexes(left: &Table, right: &Table, driver: &dyn DiffDriver, out: &mut Vec<TableChange>) {
    let left_idx: HashMap<&str, &Index> =
        left.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    let right_idx: HashMap<&str, &Index> = right
        .indexes
        .iter()
        .map(|i| (i.name.as_str(), i))
        .collect();

    for idx in &right.indexes {
        if !left_idx.contains_key(idx.name.as_str()) {
            out.push(TableChange::AddIndex(idx.clone()));
        }
    }
    for idx in &left.indexes {
        if !right_idx.contains_key(idx.name.as_str()) {
            out.push(TableChange::DropIndex(idx.name.clone()));
        }
    }
    for idx in &left.indexes {
        if let Some(right_idx) = right_idx.get(idx.name.as_str()) {
            let mut mask = ChangeMask::empty();
            if idx.unique != right_idx.unique {
                mask |= ChangeBit::Unique;
            }
            if !index_parts_equal(&idx.parts, &right_idx.parts) {
                mask |= ChangeBit::Parts;
            }
            if !attrs_equal(&idx.attrs, &right_idx.attrs, driver) {
                mask |= ChangeBit::Comment;
            }
            if !mask.is_empty() {
                out.push(TableChange::ModifyIndex {
                    name: idx.name.clone(),
                    from: idx.clone(),
                    to: (*right_idx).clone(),
                    mask,
                });
            }
        }
    }
}

fn index_parts_equal(a: &[IndexPart], b: &[IndexPart]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted: Vec<&IndexPart> = a.iter().collect();
    let mut b_sorted: Vec<&IndexPart> = b.iter().collect();
    a_sorted.sort_by_key(|p| p.position);
    b_sorted.sort_by_key(|p| p.position);
    a_sorted
        .iter()
        .zip(b_sorted.iter())
        .all(|(x, y)| x.kind == y.kind && x.descending == y.descending)
}

fn attrs_equal(a: &[Attribute], b: &[Attribute], driver: &dyn DiffDriver) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|attr| {
        b.iter()
            .any(|other| attr.tag() == other.tag() && driver.attrs_equivalent(attr, other))
    })
}

fn diff_foreign_keys(
    left: &Table,
    right: &Table,
    driver: &dyn DiffDriver,
    out: &mut Vec<TableChange>,
) {
    let left_fks: HashMap<&str, &ForeignKey> = left
        .foreign_keys
        .iter()
        .map(|f| (f.symbol.as_str(), f))
        .collect();
    let right_fks: HashMap<&str, &ForeignKey> = right
        .foreign_keys
        .iter()
        .map(|f| (f.symbol.as_str(), f))
        .collect();

    for fk in &right.foreign_keys {
        if !left_fks.contains_key(fk.symbol.as_str()) {
            out.push(TableChange::AddForeignKey(fk.clone()));
        }
    }
    for fk in &left.foreign_keys {
        if !right_fks.contains_key(fk.symbol.as_str()) {
            out.push(TableChange::DropForeignKey(fk.symbol.clone()));
        }
    }
    for fk in &left.foreign_keys {
        if let Some(right_fk) = right_fks.get(fk.symbol.as_str()) {
            let mut mask = ChangeMask::empty();
            if fk.ref_columns != right_fk.ref_columns {
                mask |= ChangeBit::RefColumn;
            }
            if fk.ref_table != right_fk.ref_table {
                mask |= ChangeBit::RefTable;
            }
            // `ForeignKey::on_update`/`on_delete` are plain `ReferenceAction`
            // values, not `Option`: by the time a foreign key reaches the
            // differ, an inspector has already resolved "no clause in the
            // DDL" to `driver.default_reference_action()` (spec.md §4.3).
            // There's nothing left to normalize here.
            if fk.on_update != right_fk.on_update || fk.on_delete != right_fk.on_delete {
                mask |= ChangeBit::Action;
            }
            if !mask.is_empty() {
                out.push(TableChange::ModifyForeignKey {
                    symbol: fk.symbol.clone(),
                    from: fk.clone(),
                    to: (*right_fk).clone(),
                    mask,
                });
            }
        }
    }
}

fn diff_checks(left: &Table, right: &Table, out: &mut Vec<TableChange>) {
    // Named checks have stable identity: pair them by name.
    let left_named: HashMap<&str, &str> = left
        .checks
        .iter()
        .filter_map(|c| c.name.as_deref().map(|n| (n, c.expression.as_str())))
        .collect();
    let right_named: HashMap<&str, &str> = right
        .checks
        .iter()
        .filter_map(|c| c.name.as_deref().map(|n| (n, c.expression.as_str())))
        .collect();

    for check in right.checks.iter().filter(|c| c.name.is_some()) {
        let name = check.name.as_deref().unwrap();
        if !left_named.contains_key(name) {
            out.push(TableChange::AddCheck(check.clone()));
        }
    }
    for check in left.checks.iter().filter(|c| c.name.is_some()) {
        let name = check.name.as_deref().unwrap();
        match right_named.get(name) {
            None => out.push(TableChange::DropCheck(check.clone())),
            Some(expr) if *expr != check.expression => {
                // A changed CHECK body is modeled as drop+add since the
                // algebra has no ModifyCheck variant (spec.md §4.2); the
                // planner's rebuild procedure handles both uniformly.
                out.push(TableChange::DropCheck(check.clone()));
                out.push(TableChange::AddCheck(relschema_core::Check {
                    name: check.name.clone(),
                    expression: expr.to_string(),
                }));
            }
            _ => {}
        }
    }

    // Unnamed checks have no name to pair by; a position-derived one
    // would silently change identity on reordering, so they're compared
    // as a multiset of expression text instead.
    let mut left_unnamed_counts: HashMap<&str, usize> = HashMap::new();
    for c in left.checks.iter().filter(|c| c.name.is_none()) {
        *left_unnamed_counts.entry(c.expression.as_str()).or_default() += 1;
    }
    let mut right_unnamed_counts: HashMap<&str, usize> = HashMap::new();
    for c in right.checks.iter().filter(|c| c.name.is_none()) {
        *right_unnamed_counts.entry(c.expression.as_str()).or_default() += 1;
    }

    for (&expr, &right_count) in &right_unnamed_counts {
        let left_count = left_unnamed_counts.get(expr).copied().unwrap_or(0);
        if right_count > left_count {
            out.extend(
                right
                    .checks
                    .iter()
                    .filter(|c| c.name.is_none() && c.expression == expr)
                    .take(right_count - left_count)
                    .map(|c| TableChange::AddCheck(c.clone())),
            );
        }
    }
    for (&expr, &left_count) in &left_unnamed_counts {
        let right_count = right_unnamed_counts.get(expr).copied().unwrap_or(0);
        if left_count > right_count {
            out.extend(
                left.checks
                    .iter()
                    .filter(|c| c.name.is_none() && c.expression == expr)
                    .take(left_count - right_count)
                    .map(|c| TableChange::DropCheck(c.clone())),
            );
        }
    }
}

fn diff_attrs(
    left: &[Attribute],
    right: &[Attribute],
    driver: &dyn DiffDriver,
    out: &mut Vec<TableChange>,
) {
    let tags = driver.diffable_attr_tags();
    for tag in tags {
        let l = find_attr(left, tag);
        let r = find_attr(right, tag);
        match (l, r) {
            (None, Some(r)) => out.push(TableChange::AddAttr(r.clone())),
            (Some(l), None) => out.push(TableChange::DropAttr(l.clone())),
            (Some(l), Some(r)) if !driver.attrs_equivalent(l, r) => {
                out.push(TableChange::ModifyAttr {
                    from: l.clone(),
                    to: r.clone(),
                })
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relschema_core::{Column, ColumnType, PrimaryKey};

    struct PermissiveDriver;
    impl DiffDriver for PermissiveDriver {
        fn diffable_attr_tags(&self) -> Vec<&'static str> {
            vec!["without_rowid", "strict"]
        }
    }

    fn sample_table() -> Table {
        let mut t = Table::new("users");
        t.columns.push(Column::new("id", ColumnType::Integer { width: Some(64), unsigned: false }).not_null());
        t.columns.push(Column::new(
            "name",
            ColumnType::String { max_length: Some(255), fixed: false },
        ));
        t.primary_key = Some(PrimaryKey {
            name: None,
            attrs: Vec::new(),
            parts: vec!["id".to_string()],
        });
        t.link().unwrap();
        t
    }

    fn realm_with(table: Table) -> Realm {
        let mut schema = Schema::new("main");
        schema.tables.push(table);
        Realm { schemas: vec![schema] }
    }

    #[test]
    fn identical_realms_diff_to_nothing() {
        let r = realm_with(sample_table());
        let changes = diff_realms(&r, &r, &PermissiveDriver, &DiffConfig::new()).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn added_column_is_detected() {
        let left = realm_with(sample_table());
        let mut table = sample_table();
        table.columns.push(
            Column::new("email", ColumnType::String { max_length: None, fixed: false }).not_null(),
        );
        let right = realm_with(table);

        let changes = diff_realms(&left, &right, &PermissiveDriver, &DiffConfig::new()).unwrap();
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::ModifyTable { name, changes } => {
                assert_eq!(name, "users");
                assert!(matches!(&changes[0], TableChange::AddColumn(c) if c.name == "email"));
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn dropped_table_is_detected() {
        let left = realm_with(sample_table());
        let right = Realm { schemas: vec![Schema::new("main")] };
        let changes = diff_realms(&left, &right, &PermissiveDriver, &DiffConfig::new()).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], SchemaChange::DropTable(n) if n == "users"));
    }

    #[test]
    fn unnamed_check_added_is_detected_without_synthetic_name() {
        let left = realm_with(sample_table());
        let mut table = sample_table();
        table.checks.push(relschema_core::Check { name: None, expression: "id <> 0".to_string() });
        let right = realm_with(table);

        let changes = diff_realms(&left, &right, &PermissiveDriver, &DiffConfig::new()).unwrap();
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::ModifyTable { changes, .. } => {
                assert_eq!(changes.len(), 1);
                match &changes[0] {
                    TableChange::AddCheck(c) => {
                        assert_eq!(c.name, None);
                        assert_eq!(c.expression, "id <> 0");
                    }
                    other => panic!("unexpected change: {other:?}"),
                }
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn duplicate_unnamed_checks_pair_off_by_count_not_position() {
        let mut left_table = sample_table();
        left_table.checks.push(relschema_core::Check { name: None, expression: "id <> 0".to_string() });
        let left = realm_with(left_table);

        let mut right_table = sample_table();
        right_table.checks.push(relschema_core::Check { name: None, expression: "id <> 0".to_string() });
        right_table.checks.push(relschema_core::Check { name: None, expression: "id <> 0".to_string() });
        let right = realm_with(right_table);

        // Two identical unnamed checks on the right vs. one on the left:
        // exactly one add, not a spurious drop+add pair.
        let changes = diff_realms(&left, &right, &PermissiveDriver, &DiffConfig::new()).unwrap();
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::ModifyTable { changes, .. } => {
                assert_eq!(changes.len(), 1);
                assert!(matches!(&changes[0], TableChange::AddCheck(c) if c.expression == "id <> 0"));
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }
}
