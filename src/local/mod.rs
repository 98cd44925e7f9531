//! Local filesystem accessor.
//!
//! Thin async wrapper over `tokio::fs` that produces [`LocalEntry`]
//! snapshots and applies modification times. Timestamps are set with
//! `filetime` on the blocking pool, which works for directories too.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use filetime::FileTime;
use tokio::fs;
use tracing::{trace, warn};

use crate::model::{LocalEntry, LocalKind};

/// Accessor for the local side of a sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// List the immediate children of `dir`.
    ///
    /// Entries whose name is not valid UTF-8 are skipped with a warning,
    /// since the remote store only accepts string names.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn list_dir(&self, dir: &Path) -> io::Result<Vec<LocalEntry>> {
        let mut reader = fs::read_dir(dir).await?;
        let mut entries = Vec::new();

        while let Some(item) = reader.next_entry().await? {
            let path = item.path();
            let Some(name) = item.file_name().to_str().map(String::from) else {
                warn!(path = %path.display(), "Skipping entry with non UTF-8 name");
                continue;
            };

            match fs::metadata(&path).await {
                Ok(meta) => entries.push(entry_from_metadata(path, name, &meta)?),
                Err(e) => warn!(path = %path.display(), error = %e, "Cannot stat entry"),
            }
        }

        trace!(dir = %dir.display(), count = entries.len(), "Listed local directory");
        Ok(entries)
    }

    /// Stat a single path, returning `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than "not found".
    pub async fn stat(&self, path: &Path) -> io::Result<Option<LocalEntry>> {
        match fs::metadata(path).await {
            Ok(meta) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                entry_from_metadata(path.to_path_buf(), name, &meta).map(Some)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a single directory. The parent must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path).await
    }

    /// Set both access and modification time of a file or directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the times cannot be set.
    pub async fn set_mtime(&self, path: &Path, time: DateTime<Utc>) -> io::Result<()> {
        let path = path.to_path_buf();
        let time = FileTime::from_system_time(SystemTime::from(time));

        tokio::task::spawn_blocking(move || filetime::set_file_times(&path, time, time))
            .await
            .map_err(io::Error::other)?
    }

    /// Open a file for streaming its content out.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn open_read(&self, path: &Path) -> io::Result<fs::File> {
        fs::File::open(path).await
    }

    /// Create (or truncate) a file for streaming content in.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub async fn open_write(&self, path: &Path) -> io::Result<fs::File> {
        fs::File::create(path).await
    }

    /// Move `from` over `to`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    pub async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

}

fn entry_from_metadata(
    full_path: PathBuf,
    name: String,
    meta: &std::fs::Metadata,
) -> io::Result<LocalEntry> {
    let kind = if meta.is_dir() {
        LocalKind::Directory
    } else {
        LocalKind::File
    };

    Ok(LocalEntry {
        full_path,
        name,
        modified: DateTime::<Utc>::from(meta.modified()?),
        size: meta.len(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_dir_reports_kinds_and_sizes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut entries = LocalFs.list_dir(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].kind, LocalKind::File);
        assert_eq!(entries[0].size, 5);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir());
    }

    #[tokio::test]
    async fn test_stat_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        assert!(LocalFs.stat(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_mtime_keeps_sub_second_precision() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        let t = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        LocalFs.set_mtime(&file, t).await.unwrap();

        assert_eq!(LocalFs.stat(&file).await.unwrap().unwrap().modified, t);
    }

    #[tokio::test]
    async fn test_set_mtime_on_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        let sub = dir.path().join("sub");
        std::fs::write(&file, b"x").unwrap();
        LocalFs.create_dir(&sub).await.unwrap();

        let t = Utc.with_ymd_and_hms(2023, 5, 17, 8, 30, 0).unwrap();
        LocalFs.set_mtime(&file, t).await.unwrap();
        LocalFs.set_mtime(&sub, t).await.unwrap();

        assert_eq!(LocalFs.stat(&file).await.unwrap().unwrap().modified, t);
        assert_eq!(LocalFs.stat(&sub).await.unwrap().unwrap().modified, t);
    }
}
