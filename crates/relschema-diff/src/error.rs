//! Diff engine errors.

use thiserror::Error;

/// The diff engine refuses to produce a changeset in exactly one case
/// (`spec.md` §4.3): a target that renames or removes a primary key in a
/// way the dialect declares unsupported. Everything else it can express as
/// a change, however destructive.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("cannot diff primary key on table '{table}': {reason}")]
    UnsupportedPrimaryKeyChange { table: String, reason: String },

    #[error("duplicate change targeting column '{column}' on table '{table}'")]
    ConflictingColumnChange { table: String, column: String },
}

pub type Result<T> = std::result::Result<T, DiffError>;
