//! Error types shared by the schema model and change algebra.

use thiserror::Error;

/// Errors raised while constructing or validating a schema model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("schema '{0}' not found")]
    SchemaNotFound(String),

    #[error("column '{column}' not found on table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("foreign key '{symbol}' on table '{table}' has mismatched column counts ({local} local vs {referenced} referenced)")]
    ForeignKeyColumnMismatch {
        table: String,
        symbol: String,
        local: usize,
        referenced: usize,
    },

    #[error("index '{index}' on table '{table}' has no parts")]
    EmptyIndex { table: String, index: String },

    #[error("primary key on table '{0}' must be a unique index with at least one part")]
    InvalidPrimaryKey(String),

    #[error("duplicate change targeting '{0}' within a single ModifyTable")]
    Conflict(String),
}

/// Result type alias for schema-model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
