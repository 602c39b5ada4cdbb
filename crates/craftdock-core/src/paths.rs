//! Path resolution for craftdock data directories.
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive I/O; adapters handle user prompts separately
//! - `CRAFTDOCK_DATA_DIR` overrides the platform default, which keeps
//!   tests and packaged installs away from the real user data root

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// No platform data directory could be determined.
    #[error("could not determine a data directory for this platform")]
    NoDataRoot,

    /// Directory creation failed.
    #[error("failed to create directory {path}: {source}")]
    CreateFailed {
        /// The directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Root directory for all craftdock data.
///
/// `CRAFTDOCK_DATA_DIR` wins when set; otherwise the platform data dir
/// (e.g. `~/.local/share/craftdock`).
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(dir) = std::env::var("CRAFTDOCK_DATA_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|d| d.join("craftdock"))
        .ok_or(PathError::NoDataRoot)
}

/// Directory holding one subdirectory per managed server.
pub fn servers_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("servers"))
}

/// Create a directory (and parents) if it does not exist yet.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    std::fs::create_dir_all(path).map_err(|source| PathError::CreateFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_directory_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn servers_dir_is_under_data_root() {
        // Only check the suffix; the root depends on the environment.
        if let Ok(dir) = servers_dir() {
            assert!(dir.ends_with("servers"));
        }
    }
}
