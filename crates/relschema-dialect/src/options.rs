//! Per-operation options, following the teacher's builder-method style
//! (`CompareConfig::without_comments()`) rather than a single global
//! settings object.

use std::time::Duration;

/// Options controlling a live-database inspection pass.
#[derive(Debug, Clone)]
pub struct InspectOptions {
    /// Restrict inspection to these schema names; empty means "all".
    pub schemas: Vec<String>,
    /// Include SQLite/engine-internal tables (e.g. `sqlite_sequence`).
    pub include_system: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            include_system: false,
        }
    }
}

impl InspectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.schemas.push(name.into());
        self
    }

    pub fn including_system(mut self) -> Self {
        self.include_system = true;
        self
    }
}

/// Options controlling how a changeset is turned into a [`crate::Plan`].
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Name assigned to the produced plan (typically a version string).
    pub name: String,
}

impl PlanOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Timeout for advisory lock acquisition; zero means block indefinitely.
#[derive(Debug, Clone, Copy)]
pub struct LockTimeout(pub Option<Duration>);

impl LockTimeout {
    pub fn blocking() -> Self {
        LockTimeout(None)
    }

    pub fn after(d: Duration) -> Self {
        LockTimeout(Some(d))
    }
}
