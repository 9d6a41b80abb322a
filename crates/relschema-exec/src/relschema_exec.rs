//! relschema-exec — the migration executor and CI schema-analyzer hook.
//!
//! Applies pending files from a migration directory to a target database
//! transactionally, tracking applied versions in a `RevisionStore`, and
//! (separately) replays a feature branch's files onto a sandbox database
//! for schema-level CI analysis.

mod analyzer;
mod database;
mod error;
mod executor;
mod logger;
mod revision;
mod splitter;

pub use analyzer::{run_ci_hook, Analyzer, Diagnostic, FileReport, Severity, StepReport, StmtReport, SummaryReport};
pub use database::{DatabaseHandle, SqliteHandle};
pub use error::{ExecError, Result};
pub use executor::{ExecuteOptions, Executor};
pub use logger::{LogEvent, MigrationLogger, NullLogger, TracingLogger};
pub use revision::{InMemoryRevisionStore, Revision, RevisionStore, SqliteRevisionStore};
pub use splitter::split_statements;
