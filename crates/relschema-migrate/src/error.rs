use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("checksum mismatch for {file}: manifest says {expected}, computed {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("checksum manifest not found at {path}")]
    ChecksumNotFound { path: PathBuf },

    #[error("malformed manifest at {path}: {detail}")]
    ChecksumFormat { path: PathBuf, detail: String },

    #[error("invalid migration filename {0}")]
    InvalidFilename(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MigrateError>;
