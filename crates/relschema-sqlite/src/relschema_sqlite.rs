//! relschema-sqlite — the reference dialect driver.
//!
//! Implements every capability trait from `relschema_dialect` and
//! `relschema_diff::DiffDriver` against SQLite's catalog (`sqlite_master`,
//! the `PRAGMA table_info`/`index_list`/`foreign_key_list` family) plus a
//! tolerant regex pass over stored `CREATE TABLE`/`CREATE INDEX` text for
//! the handful of details PRAGMAs don't expose: named `PRIMARY KEY`/`CHECK`
//! constraints, `GENERATED ALWAYS AS` columns, and the `STRICT`/
//! `WITHOUT ROWID` table suffixes.

mod driver;
mod exec;
mod inspect;
mod lock;
mod parse;
mod plan;
mod types;

pub use driver::SqliteDiffDriver;
pub use exec::SqliteExecer;
pub use inspect::SqliteInspector;
pub use lock::SqliteLocker;
pub use plan::SqlitePlanner;
