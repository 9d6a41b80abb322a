//! relschema-diff — the dialect-agnostic diff engine frame.
//!
//! The frame walks two schema snapshots and produces a [`relschema_core::Changeset`],
//! delegating dialect-specific questions (is this type change meaningful?
//! is this default expression equivalent? can this primary key be renamed?)
//! to a small [`DiffDriver`] capability the dialect supplies.

mod config;
mod driver;
mod engine;
mod error;

pub use config::*;
pub use driver::*;
pub use engine::*;
pub use error::*;
