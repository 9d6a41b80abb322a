//! Migration directory: an append-only, ordered set of `.sql` files plus
//! a checksum manifest (`atlas.sum`) that commits to filename and content
//! of every file in the directory.

mod directory;
mod error;
mod formatter;
mod manifest;

pub use directory::{FileKind, MigrationDir, MigrationFile};
pub use error::{MigrateError, Result};
pub use formatter::{Formatter, NativeFormatter, UpDownFormatter};
pub use manifest::{validate, write_sum, Manifest, MANIFEST_FILE};
