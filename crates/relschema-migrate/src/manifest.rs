//! `atlas.sum` format: line 1 is the top hash over the concatenation of
//! every subsequent line (including their terminating newlines); each
//! following line is `<filename> h1:<hash>` for one migration file, in
//! directory order. Hashes are base64 (standard alphabet, unpadded) of
//! SHA-256, matching `spec.md` §6's `base64(RawStdEncoding)`.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::{MigrateError, Result};

pub const MANIFEST_FILE: &str = "atlas.sum";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub top_hash: String,
    pub entries: Vec<(String, String)>,
}

impl Manifest {
    /// Computes the manifest for a set of files, in the order given. The
    /// order is significant: the top hash commits to it.
    pub fn compute(files: &[(String, Vec<u8>)]) -> Self {
        let entries: Vec<(String, String)> = files
            .iter()
            .map(|(name, bytes)| (name.clone(), hash_bytes(bytes)))
            .collect();

        let body = render_entries(&entries);
        let top_hash = hash_bytes(body.as_bytes());

        Self { top_hash, entries }
    }

    pub fn render(&self) -> String {
        format!("h1:{}\n{}", self.top_hash, render_entries(&self.entries))
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut lines = content.lines();
        let top_line = lines.next().ok_or_else(|| MigrateError::ChecksumFormat {
            path: path.to_path_buf(),
            detail: "empty manifest".to_string(),
        })?;
        let top_hash = top_line
            .strip_prefix("h1:")
            .ok_or_else(|| MigrateError::ChecksumFormat {
                path: path.to_path_buf(),
                detail: format!("top line missing h1: prefix: {top_line:?}"),
            })?
            .to_string();

        let mut entries = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, hash) = line.split_once(" h1:").ok_or_else(|| MigrateError::ChecksumFormat {
                path: path.to_path_buf(),
                detail: format!("malformed entry line: {line:?}"),
            })?;
            entries.push((name.to_string(), hash.to_string()));
        }

        Ok(Self { top_hash, entries })
    }

    fn verify_top_hash(&self) -> bool {
        let body = render_entries(&self.entries);
        hash_bytes(body.as_bytes()) == self.top_hash
    }
}

fn render_entries(entries: &[(String, String)]) -> String {
    let mut body = String::new();
    for (name, hash) in entries {
        body.push_str(name);
        body.push_str(" h1:");
        body.push_str(hash);
        body.push('\n');
    }
    body
}

fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    STANDARD_NO_PAD.encode(digest)
}

/// Recomputes the manifest from `files` and writes it to `<dir>/atlas.sum`,
/// overwriting any existing one. Called after every `Formatter` write.
pub fn write_sum(dir: &Path, files: &[(String, Vec<u8>)]) -> Result<()> {
    let manifest = Manifest::compute(files);
    let path = dir.join(MANIFEST_FILE);
    fs::write(&path, manifest.render()).map_err(|source| MigrateError::Io { path, source })
}

/// Validates that `<dir>/atlas.sum` matches the hashes of `files`.
/// A missing manifest is reported as `ChecksumNotFound`, which callers
/// may treat as acceptable for a fresh directory rather than fatal.
pub fn validate(dir: &Path, files: &[(String, Vec<u8>)]) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MigrateError::ChecksumNotFound { path })
        }
        Err(source) => return Err(MigrateError::Io { path, source }),
    };

    let on_disk = Manifest::parse(&content, &path)?;
    if !on_disk.verify_top_hash() {
        return Err(MigrateError::ChecksumFormat {
            path,
            detail: "top hash does not match manifest body".to_string(),
        });
    }

    let computed = Manifest::compute(files);
    if computed.top_hash != on_disk.top_hash {
        // Find the first mismatching or missing entry to name in the error.
        for (name, bytes) in files {
            let actual = hash_bytes(bytes);
            match on_disk.entries.iter().find(|(n, _)| n == name) {
                Some((_, expected)) if expected == &actual => {}
                Some((_, expected)) => {
                    return Err(MigrateError::ChecksumMismatch {
                        file: name.clone(),
                        expected: expected.clone(),
                        actual,
                    })
                }
                None => {
                    return Err(MigrateError::ChecksumMismatch {
                        file: name.clone(),
                        expected: "<missing>".to_string(),
                        actual,
                    })
                }
            }
        }
        return Err(MigrateError::ChecksumMismatch {
            file: "<directory ordering>".to_string(),
            expected: on_disk.top_hash,
            actual: computed.top_hash,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn files() -> Vec<(String, Vec<u8>)> {
        vec![
            ("20260101000000_init.sql".to_string(), b"CREATE TABLE t (id INTEGER);".to_vec()),
            ("20260102000000_add_col.sql".to_string(), b"ALTER TABLE t ADD COLUMN x;".to_vec()),
        ]
    }

    #[test]
    fn write_then_validate_succeeds() {
        let dir = tempdir().unwrap();
        let f = files();
        write_sum(dir.path(), &f).unwrap();
        validate(dir.path(), &f).unwrap();
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let dir = tempdir().unwrap();
        let err = validate(dir.path(), &files()).unwrap_err();
        assert!(matches!(err, MigrateError::ChecksumNotFound { .. }));
    }

    #[test]
    fn mutated_file_bytes_mismatch() {
        let dir = tempdir().unwrap();
        let f = files();
        write_sum(dir.path(), &f).unwrap();

        let mut mutated = f.clone();
        mutated[0].1 = b"CREATE TABLE t (id INTEGER, extra TEXT);".to_vec();

        let err = validate(dir.path(), &mutated).unwrap_err();
        assert!(matches!(err, MigrateError::ChecksumMismatch { .. }));
    }

    #[test]
    fn renamed_file_mismatches() {
        let dir = tempdir().unwrap();
        let f = files();
        write_sum(dir.path(), &f).unwrap();

        let mut renamed = f.clone();
        renamed[0].0 = "20260101000000_renamed.sql".to_string();

        let err = validate(dir.path(), &renamed).unwrap_err();
        assert!(matches!(err, MigrateError::ChecksumMismatch { .. }));
    }
}
