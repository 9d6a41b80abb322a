//! The dialect-facing error taxonomy (`spec.md` §7).

use thiserror::Error;

/// Errors a dialect capability can raise. Each variant carries enough
/// context for an operator to either fix the source or safely re-run, per
/// `spec.md` §7's propagation policy: inspection and diffing never recover,
/// they just return this.
#[derive(Error, Debug)]
pub enum DialectError {
    #[error("{kind} '{name}' does not exist")]
    NotExist { kind: &'static str, name: String },

    #[error("{0} is not supported by this dialect")]
    Unsupported(String),

    #[error("failed to parse {entity}: {detail} (near: {snippet:?})")]
    Parse {
        entity: String,
        detail: String,
        snippet: Option<String>,
    },

    #[error("conflicting changes to '{0}'")]
    Conflict(String),

    #[error("could not acquire lock '{name}' within the given timeout")]
    Locked { name: String },

    #[error("statement {index} in {context} failed: {cause}")]
    Exec {
        context: String,
        index: usize,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Model(#[from] relschema_core::ModelError),
}

pub type Result<T> = std::result::Result<T, DialectError>;
