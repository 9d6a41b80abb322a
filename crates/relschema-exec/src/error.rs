use relschema_dialect::DialectError;
use relschema_migrate::MigrateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("migration directory error: {0}")]
    Migrate(#[from] MigrateError),

    #[error("dialect error: {0}")]
    Dialect(#[from] DialectError),

    #[error("applying {file}, statement {stmt}: {cause}")]
    Statement {
        file: String,
        stmt: usize,
        #[source]
        cause: DialectError,
    },

    #[error("revision store error: {0}")]
    Revision(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, ExecError>;
