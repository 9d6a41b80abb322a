//! CI analyzer hook: replays a feature branch's migration files onto a
//! sandbox "dev" database one statement at a time, re-inspecting and
//! diffing after each, and hands the resulting schema-level changes to
//! pluggable `Analyzer`s that may flag problems (e.g. a destructive
//! change with no corresponding down-migration).

use std::path::Path;
use std::sync::Arc;

use relschema_core::{Changeset, Realm};
use relschema_diff::{diff_realms, DiffConfig, DiffDriver};
use relschema_dialect::{InspectOptions, Inspector};
use relschema_migrate::MigrationDir;

use crate::database::DatabaseHandle;
use crate::error::{ExecError, Result};
use crate::splitter::split_statements;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// A plugin that inspects the schema-level effect of one statement and
/// may emit diagnostics about it. `position` is the statement's index
/// within its file.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, file: &str, position: usize, stmt: &str, changes: &Changeset) -> Vec<Diagnostic>;
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub ok: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StmtReport {
    pub position: usize,
    pub stmt: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub name: String,
    pub reports: Vec<StmtReport>,
}

#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub steps: Vec<StepReport>,
    pub files: Vec<FileReport>,
    pub schema_current: Realm,
    pub schema_desired: Realm,
}

/// Runs the hook against `feature_files` (already resolved by the
/// caller's VCS diff provider — out of core per `spec.md` §4.7). `dev_db`
/// must be a private, exclusively-owned instance; this function never
/// touches anything else.
pub async fn run_ci_hook(
    dir: &MigrationDir,
    feature_files: &[&Path],
    dev_db: Arc<dyn DatabaseHandle>,
    inspector: Arc<dyn Inspector>,
    diff_driver: Arc<dyn DiffDriver>,
    analyzers: &[Arc<dyn Analyzer>],
) -> Result<SummaryReport> {
    let mut steps = Vec::new();

    match dir.validate() {
        Ok(()) => steps.push(StepReport {
            name: "Integrity Check".to_string(),
            ok: true,
            detail: None,
        }),
        Err(relschema_migrate::MigrateError::ChecksumNotFound { .. }) => steps.push(StepReport {
            name: "Integrity Check".to_string(),
            ok: true,
            detail: Some("no manifest yet (fresh directory)".to_string()),
        }),
        Err(e) => {
            steps.push(StepReport {
                name: "Integrity Check".to_string(),
                ok: false,
                detail: Some(e.to_string()),
            });
            return Err(ExecError::Migrate(e));
        }
    }

    let opts = InspectOptions::new();
    let schema_current = inspector.inspect(&opts).await.map_err(ExecError::Dialect)?;
    let mut before = schema_current.clone();

    let config = DiffConfig::default();
    let mut files = Vec::with_capacity(feature_files.len());

    for path in feature_files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let content = std::fs::read_to_string(path).map_err(|source| {
            ExecError::Migrate(relschema_migrate::MigrateError::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;
        let statements = split_statements(&content);

        let mut reports = Vec::with_capacity(statements.len());
        for (position, stmt) in statements.iter().enumerate() {
            dev_db.begin()?;
            if let Err(e) = dev_db.execute(stmt) {
                let _ = dev_db.rollback();
                return Err(e);
            }
            dev_db.commit()?;

            let after = inspector.inspect(&opts).await.map_err(ExecError::Dialect)?;
            let changes = diff_realms(&before, &after, diff_driver.as_ref(), &config)
                .map_err(|e| ExecError::Database(e.to_string()))?;

            let diagnostics = analyzers
                .iter()
                .flat_map(|a| a.analyze(&name, position, stmt, &changes))
                .collect();

            reports.push(StmtReport {
                position,
                stmt: stmt.clone(),
                diagnostics,
            });
            before = after;
        }

        files.push(FileReport { name, reports });
    }

    Ok(SummaryReport {
        steps,
        files,
        schema_current,
        schema_desired: before,
    })
}
