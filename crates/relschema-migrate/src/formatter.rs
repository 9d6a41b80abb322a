//! Writes a `Plan` to one or more files in a migration directory. The
//! manifest is recomputed after every write so the directory is never
//! left with stale checksums.

use std::fs;
use std::path::PathBuf;

use relschema_core::Plan;

use crate::directory::MigrationDir;
use crate::error::{MigrateError, Result};

pub trait Formatter {
    /// Writes `plan` as the migration for `version` (and optional label),
    /// returning the paths written, and leaves the directory's manifest
    /// up to date.
    fn write_plan(&self, dir: &MigrationDir, version: &str, label: Option<&str>, plan: &Plan) -> Result<Vec<PathBuf>>;
}

fn file_stem(version: &str, label: Option<&str>) -> String {
    match label {
        Some(l) => format!("{version}_{l}"),
        None => version.to_string(),
    }
}

fn render_up(plan: &Plan) -> String {
    let mut out = String::new();
    for stmt in &plan.changes {
        if let Some(comment) = &stmt.comment {
            out.push_str("-- ");
            out.push_str(comment);
            out.push('\n');
        }
        out.push_str(&stmt.cmd);
        if !stmt.cmd.trim_end().ends_with(';') {
            out.push(';');
        }
        out.push('\n');
    }
    out
}

fn render_down(plan: &Plan) -> String {
    let mut out = String::new();
    for stmt in plan.changes.iter().rev() {
        let Some(reverse) = &stmt.reverse else {
            continue;
        };
        out.push_str(reverse);
        if !reverse.trim_end().ends_with(';') {
            out.push(';');
        }
        out.push('\n');
    }
    out
}

/// One `.sql` file per version, forward statements only (the plan's
/// reverses, if any, are not written anywhere — the native format has no
/// down-migration slot).
pub struct NativeFormatter;

impl Formatter for NativeFormatter {
    fn write_plan(&self, dir: &MigrationDir, version: &str, label: Option<&str>, plan: &Plan) -> Result<Vec<PathBuf>> {
        let path = dir.path.join(format!("{}.sql", file_stem(version, label)));
        fs::write(&path, render_up(plan)).map_err(|source| MigrateError::Io {
            path: path.clone(),
            source,
        })?;
        dir.write_sum()?;
        Ok(vec![path])
    }
}

/// `_<version>.up.sql` / `_<version>.down.sql` pairs. The down file is
/// only written when the plan is reversible; a caller that diffs a
/// non-reversible plan with this formatter gets just the up file, same
/// as `NativeFormatter` would.
pub struct UpDownFormatter;

impl Formatter for UpDownFormatter {
    fn write_plan(&self, dir: &MigrationDir, version: &str, label: Option<&str>, plan: &Plan) -> Result<Vec<PathBuf>> {
        let stem = file_stem(version, label);
        let up_path = dir.path.join(format!("{stem}.up.sql"));
        fs::write(&up_path, render_up(plan)).map_err(|source| MigrateError::Io {
            path: up_path.clone(),
            source,
        })?;

        let mut written = vec![up_path];
        if plan.reversible() {
            let down_path = dir.path.join(format!("{stem}.down.sql"));
            fs::write(&down_path, render_down(plan)).map_err(|source| MigrateError::Io {
                path: down_path.clone(),
                source,
            })?;
            written.push(down_path);
        }

        dir.write_sum()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relschema_core::PlannedStatement;
    use tempfile::tempdir;

    fn sample_plan(reversible: bool) -> Plan {
        let mut plan = Plan::new("test");
        let mut stmt = PlannedStatement::new("CREATE TABLE t (id INTEGER)");
        if reversible {
            stmt = stmt.with_reverse("DROP TABLE t");
        }
        plan.push(stmt);
        plan
    }

    #[test]
    fn native_formatter_writes_one_file() {
        let dir = tempdir().unwrap();
        let md = MigrationDir::new(dir.path());
        let written = NativeFormatter
            .write_plan(&md, "20260101000000", Some("init"), &sample_plan(true))
            .unwrap();
        assert_eq!(written.len(), 1);
        assert!(md.validate().is_ok());
    }

    #[test]
    fn updown_formatter_skips_down_when_irreversible() {
        let dir = tempdir().unwrap();
        let md = MigrationDir::new(dir.path());
        let written = UpDownFormatter
            .write_plan(&md, "20260101000000", Some("init"), &sample_plan(false))
            .unwrap();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn updown_formatter_writes_pair_when_reversible() {
        let dir = tempdir().unwrap();
        let md = MigrationDir::new(dir.path());
        let written = UpDownFormatter
            .write_plan(&md, "20260101000000", Some("init"), &sample_plan(true))
            .unwrap();
        assert_eq!(written.len(), 2);
        assert!(md.validate().is_ok());
    }
}
