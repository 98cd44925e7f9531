//! Remote store accessor.
//!
//! The sync engine talks to the remote side only through [`RemoteStore`].
//! Two implementations ship with the crate:
//!
//! - [`DriveClient`] - Google Drive v3 over HTTPS
//! - [`MemoryStore`] - an in-process tree, used by tests and offline runs

mod drive;
mod memory;

pub use drive::{DriveClient, DRIVE_API_BASE, DRIVE_UPLOAD_BASE, FOLDER_MIME_TYPE};
pub use memory::{CallCounts, MemoryStore};

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::io::AsyncWrite;

use crate::error::Result;
use crate::model::{RemoteEntry, RemoteRef, UploadMetadata};

/// Operations the sync engine needs from a remote store.
///
/// Futures are `Send` so the engine can run entries on a multi-threaded
/// runtime.
pub trait RemoteStore: Send + Sync {
    /// List the immediate children of a container.
    fn list_children(
        &self,
        container_id: &str,
    ) -> impl Future<Output = Result<Vec<RemoteEntry>>> + Send;

    /// Fetch metadata of a single node.
    fn get_metadata(&self, id: &str) -> impl Future<Output = Result<RemoteEntry>> + Send;

    /// Create a container below `parent_id`.
    fn create_container(
        &self,
        name: &str,
        parent_id: &str,
        modified_time: DateTime<Utc>,
    ) -> impl Future<Output = Result<RemoteRef>> + Send;

    /// Upload a local file as a new child of `parent_id`.
    fn upload_new(
        &self,
        local_path: &Path,
        parent_id: &str,
        metadata: &UploadMetadata,
    ) -> impl Future<Output = Result<RemoteRef>> + Send;

    /// Replace the content of an existing file, keeping its ID.
    fn replace_content(
        &self,
        id: &str,
        metadata: &UploadMetadata,
        local_path: &Path,
    ) -> impl Future<Output = Result<RemoteRef>> + Send;

    /// Stream the content of a file into `sink`, returning the bytes written.
    fn download_content<W>(
        &self,
        id: &str,
        sink: &mut W,
    ) -> impl Future<Output = Result<u64>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}
