//! SQLite's [`DiffDriver`] implementation: the dialect-specific answers
//! the diff frame needs to avoid planning no-op changes.

use relschema_core::{Attribute, ColumnDefault, ColumnType, PrimaryKey, ReferenceAction};
use relschema_diff::{DiffDriver, Result};

use crate::types::classify;

pub struct SqliteDiffDriver;

impl DiffDriver for SqliteDiffDriver {
    /// SQLite only distinguishes types by affinity, so `VARCHAR(255)` and
    /// `TEXT` are equivalent, as are `INT` and `INTEGER`.
    fn types_equivalent(&self, a: &ColumnType, b: &ColumnType) -> bool {
        a.category_name() == b.category_name()
    }

    fn defaults_equivalent(&self, a: Option<&ColumnDefault>, b: Option<&ColumnDefault>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn diffable_attr_tags(&self) -> Vec<&'static str> {
        vec!["without_rowid", "strict"]
    }

    fn attrs_equivalent(&self, a: &Attribute, b: &Attribute) -> bool {
        a == b
    }

    fn default_reference_action(&self) -> ReferenceAction {
        ReferenceAction::NoAction
    }

    /// SQLite has no `ALTER TABLE ... DROP/ADD PRIMARY KEY`; every PK
    /// change goes through the full rebuild procedure, so this driver
    /// never refuses — it's always expressible, just not inline.
    fn check_primary_key_change(
        &self,
        table: &str,
        from: Option<&PrimaryKey>,
        to: Option<&PrimaryKey>,
    ) -> Result<()> {
        let _ = (table, from, to);
        Ok(())
    }
}

impl SqliteDiffDriver {
    /// Exposed for the planner: whether a declared type string classifies
    /// the same way the inspector would, used when comparing a desired
    /// state authored as raw type text against a live inspection result.
    pub fn classify_declared(&self, declared: &str) -> ColumnType {
        classify(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varchar_and_text_are_equivalent() {
        let driver = SqliteDiffDriver;
        let a = ColumnType::String { max_length: Some(255), fixed: false };
        let b = ColumnType::String { max_length: None, fixed: false };
        assert!(driver.types_equivalent(&a, &b));
    }

    #[test]
    fn integer_and_float_are_not_equivalent() {
        let driver = SqliteDiffDriver;
        let a = ColumnType::Integer { width: Some(64), unsigned: false };
        let b = ColumnType::Float { width: Some(64) };
        assert!(!driver.types_equivalent(&a, &b));
    }

    #[test]
    fn primary_key_change_is_never_refused() {
        let driver = SqliteDiffDriver;
        let from = PrimaryKey { name: None, attrs: vec![], parts: vec!["id".into()] };
        let to = PrimaryKey { name: None, attrs: vec![], parts: vec!["uuid".into()] };
        assert!(driver.check_primary_key_change("t", Some(&from), Some(&to)).is_ok());
    }
}
