//! The folder pair a sync run is anchored on.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Pairing of the remote main folder and the local root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRoot {
    pub local: PathBuf,
    pub remote_id: String,
}

impl SyncRoot {
    /// Build a root, failing fast when the local directory does not exist.
    ///
    /// Relative paths are resolved against the current directory so that
    /// filter patterns and log lines see one canonical prefix.
    ///
    /// # Errors
    ///
    /// Returns `LocalRootNotFound` if `local` is missing or not a directory,
    /// and `InvalidArgument` for an empty remote ID.
    pub fn new(local: &Path, remote_id: &str) -> Result<Self> {
        if remote_id.trim().is_empty() {
            return Err(Error::InvalidArgument("remote folder ID is empty".to_string()));
        }

        if !local.is_dir() {
            return Err(Error::LocalRootNotFound {
                path: local.to_path_buf(),
            });
        }

        let local = std::path::absolute(local)?;

        Ok(Self {
            local,
            remote_id: remote_id.trim().to_string(),
        })
    }

    /// Render a path below the root as `./relative`, for log output.
    #[must_use]
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.local) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => format!("./{}", rel.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_local_root_fails_fast() {
        let err = SyncRoot::new(Path::new("/definitely/not/here"), "root").unwrap_err();
        assert!(matches!(err, Error::LocalRootNotFound { .. }));
    }

    #[test]
    fn test_empty_remote_id_rejected() {
        let dir = TempDir::new().unwrap();
        let err = SyncRoot::new(dir.path(), "  ").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_display_path_is_root_relative() {
        let dir = TempDir::new().unwrap();
        let root = SyncRoot::new(dir.path(), "root").unwrap();

        assert_eq!(root.display_path(&root.local), ".");
        assert_eq!(
            root.display_path(&root.local.join("docs").join("a.txt")),
            format!("./{}", Path::new("docs").join("a.txt").display())
        );
    }
}
