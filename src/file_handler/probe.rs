//! Path probes and small OS utilities.
//!
//! The probes (`exists`, `file_size`, `absolute`, `list_dir`) never modify
//! anything; `rename` and `remove` are the only mutating helpers here.

use crate::error::{FileIoError, Result};
use std::path::{Component, Path, PathBuf};

/// Whether anything exists at `path`
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Size of the file at `path` in bytes
pub fn file_size(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| FileIoError::from_io(e, path))?;
    if !metadata.is_file() {
        return Err(FileIoError::invalid_argument(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    Ok(metadata.len())
}

/// Absolute, lexically normalized form of `path`.
///
/// The path does not need to exist; symlinks are not resolved.
pub fn absolute(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| FileIoError::file_error("Failed to read current directory", e))?
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Names of the entries in directory `path`, sorted
pub fn list_dir(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let entries = std::fs::read_dir(path).map_err(|e| FileIoError::from_io(e, path))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FileIoError::from_io(e, path))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Rename `from` to `to`, replacing `to` if it exists
pub fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let from = from.as_ref();
    std::fs::rename(from, to.as_ref()).map_err(|e| FileIoError::from_io(e, from))?;
    log::debug!("renamed {} to {}", from.display(), to.as_ref().display());
    Ok(())
}

/// Remove the file at `path`
pub fn remove(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::remove_file(path).map_err(|e| FileIoError::from_io(e, path))
}
