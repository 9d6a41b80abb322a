//! The `DiffDriver` capability: the small set of semantic questions the
//! dialect-agnostic frame cannot answer on its own.

use relschema_core::{Attribute, ColumnDefault, ColumnType, PrimaryKey, ReferenceAction};

use crate::error::Result;

/// Dialect-supplied semantics for the diff frame. A dialect that has
/// nothing special to say can implement every method with the provided
/// default (structural equality / empty tag list).
pub trait DiffDriver: Send + Sync {
    /// Whether two column types should be treated as equivalent for diff
    /// purposes (e.g. `VARCHAR(255)` vs `varchar(255)` after case
    /// normalization, or a dialect that doesn't distinguish `INT`/`INTEGER`).
    fn types_equivalent(&self, a: &ColumnType, b: &ColumnType) -> bool {
        a == b
    }

    /// Whether two default expressions are equivalent once dialect-specific
    /// quoting/formatting is normalized away.
    fn defaults_equivalent(&self, a: Option<&ColumnDefault>, b: Option<&ColumnDefault>) -> bool {
        a == b
    }

    /// The closed list of attribute tags this dialect diffs. Attributes
    /// outside this list are ignored by the frame's attribute diff step.
    fn diffable_attr_tags(&self) -> Vec<&'static str>;

    /// Whether two attribute payloads sharing a tag are equivalent.
    fn attrs_equivalent(&self, a: &Attribute, b: &Attribute) -> bool {
        a == b
    }

    /// Normalizes an absent on-update/on-delete action to the dialect's
    /// default (`spec.md` §4.3: "empty on-update/on-delete is treated as
    /// `NO ACTION` per-dialect default").
    fn default_reference_action(&self) -> ReferenceAction {
        ReferenceAction::NoAction
    }

    /// Called when the target renames or removes a primary key. Returning
    /// `Err` makes the diff engine refuse the whole table diff — the only
    /// case in which diffing is allowed to fail rather than plan a
    /// destructive change (`spec.md` §4.3).
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
