//! The executor: applies pending migration files to a target database,
//! one transaction per file, stopping and rolling back at the first
//! failure. Holds an advisory lock for the duration of the run.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use relschema_dialect::{LockTimeout, Locker};
use relschema_migrate::MigrationDir;

use crate::database::DatabaseHandle;
use crate::error::{ExecError, Result};
use crate::logger::{LogEvent, MigrationLogger};
use crate::revision::{Revision, RevisionStore};
use crate::splitter::split_statements;

const LOCK_NAME: &str = "atlas_migrate";

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Skip `atlas.sum` integrity validation before applying. Per
    /// `spec.md` §4.6, integrity is checked unless the caller explicitly
    /// forces past it.
    pub force: bool,
    pub lock_timeout: Option<std::time::Duration>,
}

pub struct Executor {
    dir: MigrationDir,
    locker: Arc<dyn Locker>,
    db: Arc<dyn DatabaseHandle>,
    revisions: Arc<dyn RevisionStore>,
    logger: Arc<dyn MigrationLogger>,
}

impl Executor {
    pub fn new(
        dir: MigrationDir,
        locker: Arc<dyn Locker>,
        db: Arc<dyn DatabaseHandle>,
        revisions: Arc<dyn RevisionStore>,
        logger: Arc<dyn MigrationLogger>,
    ) -> Self {
        Self { dir, locker, db, revisions, logger }
    }

    /// Applies at most `n` pending files; `n == 0` means "all".
    pub async fn execute_n(&self, n: usize, opts: &ExecuteOptions) -> Result<Vec<Revision>> {
        if opts.force {
            // Caller accepted the risk; still attempt the scan below so a
            // missing directory still errors loudly.
            let _ = self.dir.read_all()?;
        } else {
            match self.dir.validate() {
                Ok(()) => {}
                Err(relschema_migrate::MigrateError::ChecksumNotFound { .. }) => {
                    // A directory with no manifest yet is a fresh one.
                }
                Err(e) => return Err(ExecError::Migrate(e)),
            }
        }

        let guard = self
            .locker
            .lock(LOCK_NAME, LockTimeout(opts.lock_timeout))
            .await
            .map_err(ExecError::Dialect)?;

        let result = self.execute_locked(n).await;
        drop(guard);
        result
    }

    async fn execute_locked(&self, n: usize) -> Result<Vec<Revision>> {
        let files = self.dir.list_files()?;
        let applied = self.revisions.read_revisions().await?;
        let applied_versions: std::collections::HashSet<&str> =
            applied.iter().map(|r| r.version.as_str()).collect();

        let pending: Vec<_> = files
            .into_iter()
            .filter(|f| !matches!(f.kind, relschema_migrate::FileKind::Down))
            .filter(|f| !applied_versions.contains(f.version.as_str()))
            .collect();

        let to_apply: Vec<_> = if n == 0 {
            pending
        } else {
            pending.into_iter().take(n).collect()
        };

        self.logger.log(LogEvent::Execution {
            from: applied.last().map(|r| r.version.as_str()),
            to: to_apply.last().map(|f| f.version.as_str()).unwrap_or("<none>"),
            files: to_apply.len(),
        });

        let mut results = Vec::with_capacity(to_apply.len());
        for file in &to_apply {
            let name = file.path.file_name().unwrap().to_string_lossy().into_owned();
            let description = file.label.clone().unwrap_or_default();
            self.logger.log(LogEvent::File { version: &file.version, description: &description });

            let content = std::fs::read_to_string(&file.path).map_err(|source| {
                ExecError::Migrate(relschema_migrate::MigrateError::Io { path: file.path.clone(), source })
            })?;
            let hash = file_hash(&content);
            let txmode_none = content.lines().take(5).any(|l| l.trim() == "-- atlas:txmode none");
            let statements = split_statements(&content);

            let started = Instant::now();
            if !txmode_none {
                self.db.begin()?;
            }

            let mut applied_count = 0usize;
            let mut failure: Option<String> = None;
            for stmt in &statements {
                self.logger.log(LogEvent::Stmt { sql: stmt });
                match self.db.execute(stmt) {
                    Ok(()) => applied_count += 1,
                    Err(e) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }

            let elapsed = started.elapsed().as_millis() as i64;

            if let Some(err_text) = failure {
                if !txmode_none {
                    let _ = self.db.rollback();
                }
                let revision = Revision {
                    version: file.version.clone(),
                    description,
                    applied: applied_count,
                    total: statements.len(),
                    hash,
                    error: Some(err_text.clone()),
                    executed_at: Utc::now(),
                    execution_time_ms: elapsed,
                };
                self.revisions.write_revision(&revision).await?;
                self.logger.log(LogEvent::Error { error: &err_text });
                return Err(ExecError::Statement {
                    file: name,
                    stmt: applied_count,
                    cause: relschema_dialect::DialectError::Exec {
                        context: "migration file".to_string(),
                        index: applied_count,
                        cause: err_text.into(),
                    },
                });
            }

            if !txmode_none {
                self.db.commit()?;
            }

            let revision = Revision {
                version: file.version.clone(),
                description,
                applied: applied_count,
                total: statements.len(),
                hash,
                error: None,
                executed_at: Utc::now(),
                execution_time_ms: elapsed,
            };
            self.revisions.write_revision(&revision).await?;
            results.push(revision);
        }

        self.logger.log(LogEvent::Done);
        Ok(results)
    }
}

fn file_hash(content: &str) -> String {
    use base64::engine::general_purpose::STANDARD_NO_PAD;
    use base64::Engine;
    use sha2::{Digest, Sha256};
    format!("h1:{}", STANDARD_NO_PAD.encode(Sha256::digest(content.as_bytes())))
}
