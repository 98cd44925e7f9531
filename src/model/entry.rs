//! Entry snapshots for both sides of a sync.
//!
//! Entries are read-only: a listing produces them, the engine decides on
//! them, and they are dropped. Nothing is cached between directory visits.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKind {
    File,
    Container,
}

/// A node in the remote store.
///
/// Identity is `id`. Names are not unique among siblings, so anything that
/// matches by name has to pick one (see `sync::matching`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_ids: Vec<String>,
    pub modified_time: DateTime<Utc>,
    /// Content length in bytes. Containers report 0.
    #[serde(default)]
    pub size: u64,
    pub kind: RemoteKind,
}

impl RemoteEntry {
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.kind == RemoteKind::Container
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == RemoteKind::File
    }
}

/// Reply of a create, upload or replace call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub id: String,
    pub name: String,
}

/// Metadata sent alongside file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub name: String,
    pub modified_time: DateTime<Utc>,
}

/// Kind of a local filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    File,
    Directory,
}

/// A file or directory on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub full_path: PathBuf,
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
    pub kind: LocalKind,
}

impl LocalEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == LocalKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == LocalKind::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_entry_serde_defaults() {
        let entry: RemoteEntry = serde_json::from_str(
            r#"{"id":"f1","name":"sub","modified_time":"2024-03-01T10:00:00Z","kind":"container"}"#,
        )
        .unwrap();

        assert!(entry.is_container());
        assert_eq!(entry.size, 0);
        assert!(entry.parent_ids.is_empty());
    }
}
