//! relschema-core — dialect-neutral schema model and change algebra
//!
//! This crate defines the typed data model shared by every dialect driver
//! (`Realm`, `Schema`, `Table`, `View`, `Column`, `Index`, `ForeignKey`, ...)
//! and the closed set of change variants the diff engine produces and the
//! migration planner consumes. It has no knowledge of SQL text or any
//! particular database; dialects translate to and from it.

mod change;
mod error;
mod model;
mod types;

pub use change::*;
pub use error::*;
pub use model::*;
pub use types::*;
