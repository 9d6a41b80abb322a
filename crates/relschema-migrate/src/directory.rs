//! Filesystem view of a migration directory: a flat list of
//! `<version>[_<label>].sql` files (or `.up.sql`/`.down.sql` pairs),
//! ordered lexicographically by version.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::manifest;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MigrationFile {
    pub version: String,
    pub label: Option<String>,
    pub path: PathBuf,
    pub kind: FileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileKind {
    Native,
    Up,
    Down,
}

pub struct MigrationDir {
    pub path: PathBuf,
}

impl MigrationDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lists migration files in ascending version order. `atlas.sum` and
    /// any non-`.sql` file are ignored; `.down.sql` files are listed but
    /// excluded from the applied sequence by callers that only want the
    /// forward path (the executor applies `Up`/`Native` files, never `Down`).
    pub fn list_files(&self) -> Result<Vec<MigrationFile>> {
        let mut files = Vec::new();
        let entries = fs::read_dir(&self.path).map_err(|source| MigrateError::Io {
            path: self.path.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| MigrateError::Io {
                path: self.path.clone(),
                source,
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == manifest::MANIFEST_FILE {
                continue;
            }
            if let Some(file) = parse_filename(name, &path) {
                files.push(file);
            }
        }

        files.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.kind.cmp(&b.kind)));
        Ok(files)
    }

    /// Reads every non-manifest file's name and bytes, in directory
    /// order, for manifest computation/validation.
    pub fn read_all(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let files = self.list_files()?;
        files
            .into_iter()
            .map(|f| {
                let name = f.path.file_name().unwrap().to_string_lossy().into_owned();
                let bytes = fs::read(&f.path).map_err(|source| MigrateError::Io {
                    path: f.path.clone(),
                    source,
                })?;
                Ok((name, bytes))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let files = self.read_all()?;
        manifest::validate(&self.path, &files)
    }

    pub fn write_sum(&self) -> Result<()> {
        let files = self.read_all()?;
        manifest::write_sum(&self.path, &files)
    }
}

fn parse_filename(name: &str, path: &Path) -> Option<MigrationFile> {
    let (stem, kind) = if let Some(s) = name.strip_suffix(".up.sql") {
        (s, FileKind::Up)
    } else if let Some(s) = name.strip_suffix(".down.sql") {
        (s, FileKind::Down)
    } else if let Some(s) = name.strip_suffix(".sql") {
        (s, FileKind::Native)
    } else {
        return None;
    };

    let (version, label) = match stem.split_once('_') {
        Some((v, l)) => (v.to_string(), Some(l.to_string())),
        None => (stem.to_string(), None),
    };

    Some(MigrationFile {
        version,
        label,
        path: path.to_path_buf(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn lists_in_version_order() {
        let dir = tempdir().unwrap();
        for (name, body) in [
            ("20260102000000_add_col.sql", "ALTER TABLE t ADD COLUMN x;"),
            ("20260101000000_init.sql", "CREATE TABLE t (id INTEGER);"),
        ] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            write!(f, "{body}").unwrap();
        }

        let md = MigrationDir::new(dir.path());
        let files = md.list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].version, "20260101000000");
        assert_eq!(files[1].version, "20260102000000");
    }

    #[test]
    fn ignores_manifest_file() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(manifest::MANIFEST_FILE)).unwrap();
        File::create(dir.path().join("20260101000000_init.sql")).unwrap();

        let files = MigrationDir::new(dir.path()).list_files().unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn parses_up_down_pair() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("20260101000000_init.up.sql")).unwrap();
        File::create(dir.path().join("20260101000000_init.down.sql")).unwrap();

        let files = MigrationDir::new(dir.path()).list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].kind, FileKind::Up);
        assert_eq!(files[1].kind, FileKind::Down);
    }
}
