//! File-system helpers shared by resources and the exporter.
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::DeployError;

fn write_failure(path: &Path, source: std::io::Error) -> DeployError {
    DeployError::WriteFailure {
        path: path.to_path_buf(),
        source,
    }
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns [`DeployError::WriteFailure`] if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), DeployError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_failure(parent, e))?;
    }
    Ok(())
}

/// Write `data` to `path` so readers see either the old file or the new one.
///
/// The data goes to a temporary file in the same directory, is synced, and
/// is then renamed over `path`.
///
/// # Errors
///
/// Returns [`DeployError::WriteFailure`] if any step fails; `path` is left
/// untouched in that case.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), DeployError> {
    ensure_parent_dir(path)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| write_failure(path, e))?;
    tmp.write_all(data).map_err(|e| write_failure(path, e))?;
    tmp.flush().map_err(|e| write_failure(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| write_failure(path, e))?;
    tmp.persist(path).map_err(|e| write_failure(path, e.error))?;
    Ok(())
}

/// Lowercase hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .fold(String::with_capacity(64), |mut hex, b| {
            let _ = write!(hex, "{b:02x}");
            hex
        })
}

/// Every regular file below `dir`, relative to it and sorted.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be read.
pub fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(base, &path, out)?;
            } else if let Ok(rel) = path.strip_prefix(base) {
                out.push(rel.to_path_buf());
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    if dir.is_dir() {
        walk(dir, dir, &mut out)?;
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/file.txt");
        atomic_write(&path, b"one").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"one");
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        atomic_write(&dir.path().join("f"), b"x").unwrap();
        let names = list_files(dir.path()).unwrap();
        assert_eq!(names, [PathBuf::from("f")]);
    }

    #[test]
    fn atomic_write_into_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = atomic_write(&blocker.join("child"), b"y").unwrap_err();
        assert!(matches!(err, DeployError::WriteFailure { .. }));
    }

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn list_files_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("rules")).unwrap();
        std::fs::write(dir.path().join("rules/z.mdc"), "").unwrap();
        std::fs::write(dir.path().join("mcp.json"), "").unwrap();
        let files = list_files(dir.path()).unwrap();
        assert_eq!(
            files,
            [PathBuf::from("mcp.json"), PathBuf::from("rules").join("z.mdc")]
        );
        assert!(list_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
