//! Capability traits a dialect driver implements. The core (diff engine,
//! planner, executor) only ever calls the capability it needs; a dialect
//! that has no `Locker` simply doesn't implement it.

use async_trait::async_trait;
use relschema_core::{Changeset, Plan, Realm};

use crate::error::Result;
use crate::options::{InspectOptions, LockTimeout, PlanOptions};

/// Reads a live catalog into the schema model.
#[async_trait]
pub trait Inspector: Send + Sync {
    async fn inspect(&self, opts: &InspectOptions) -> Result<Realm>;
}

/// Turns a changeset into an ordered, reversible-where-possible SQL plan.
/// Pure and synchronous: planning never touches the network.
///
/// Takes both realm snapshots, not just the changeset: a dialect that
/// needs to rebuild a whole table (SQLite's `ModifyTable` procedure for
/// changes `ALTER TABLE` can't express) needs the complete desired table
/// definition, which a diff alone doesn't carry.
pub trait Planner: Send + Sync {
    fn plan_changes(
        &self,
        opts: &PlanOptions,
        before: &Realm,
        after: &Realm,
        changes: &Changeset,
    ) -> Result<Plan>;
}

/// Applies a changeset directly to a live database, bypassing the
/// migration-directory path. Used for ad-hoc "push this diff now" flows.
#[async_trait]
pub trait Execer: Send + Sync {
    async fn exec(&self, changes: &Changeset) -> Result<()>;
}

/// A held advisory lock. Dropping it releases the lock; implementations
/// must guarantee release on every exit path (the executor relies on this
/// instead of an explicit `unlock()` call so a panic-equivalent error still
/// releases it).
pub trait LockGuard: Send {}

/// Serializes concurrent executors against the same target via a
/// dialect-specific advisory lock.
#[async_trait]
pub trait Locker: Send + Sync {
    async fn lock(&self, name: &str, timeout: LockTimeout) -> Result<Box<dyn LockGuard>>;
}

/// Dialect-specific identifier/value normalization used at trust
/// boundaries (inspection results, user-authored desired state).
pub trait Normalizer: Send + Sync {
    fn normalize_identifier(&self, name: &str) -> String {
        name.to_string()
    }
}
