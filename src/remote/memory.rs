//! In-process remote store.
//!
//! Behaves like Drive where it matters to the sync engine: IDs are opaque,
//! sibling names may repeat, and stored modification times are truncated to
//! millisecond precision. Every call is counted so tests can assert how much
//! work a pass performed.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::RemoteStore;
use crate::error::{Error, Result};
use crate::model::{RemoteEntry, RemoteKind, RemoteRef, UploadMetadata};

/// Number of calls made against a [`MemoryStore`], per operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub list_children: usize,
    pub get_metadata: usize,
    pub create_container: usize,
    pub upload_new: usize,
    pub replace_content: usize,
    pub download_content: usize,
}

impl CallCounts {
    /// Calls that changed the store.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.create_container + self.upload_new + self.replace_content
    }
}

#[derive(Debug)]
struct Node {
    entry: RemoteEntry,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    next_id: u64,
    calls: CallCounts,
    failing_container_names: HashSet<String>,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{:04}", self.next_id)
    }

    fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.entry.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.entry.id == id)
    }

    fn insert(
        &mut self,
        parent_id: &str,
        name: &str,
        kind: RemoteKind,
        modified_time: DateTime<Utc>,
        content: Vec<u8>,
    ) -> String {
        let id = self.allocate_id();
        self.nodes.push(Node {
            entry: RemoteEntry {
                id: id.clone(),
                name: name.to_string(),
                parent_ids: vec![parent_id.to_string()],
                modified_time: truncate_to_millis(modified_time),
                size: content.len() as u64,
                kind,
            },
            content,
        });
        id
    }
}

/// Remote store held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create a store with a single empty root container.
    pub fn new(root_id: impl Into<String>) -> Self {
        let mut state = State::default();
        state.nodes.push(Node {
            entry: RemoteEntry {
                id: root_id.into(),
                name: "root".to_string(),
                parent_ids: Vec::new(),
                modified_time: Utc::now(),
                size: 0,
                kind: RemoteKind::Container,
            },
            content: Vec::new(),
        });

        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a container without counting it as a call.
    pub fn add_container(&self, parent_id: &str, name: &str, modified_time: DateTime<Utc>) -> String {
        self.lock()
            .insert(parent_id, name, RemoteKind::Container, modified_time, Vec::new())
    }

    /// Add a file without counting it as a call. Empty content yields size 0.
    pub fn add_file(
        &self,
        parent_id: &str,
        name: &str,
        modified_time: DateTime<Utc>,
        content: &[u8],
    ) -> String {
        self.lock()
            .insert(parent_id, name, RemoteKind::File, modified_time, content.to_vec())
    }

    /// Make every later `create_container` call for `name` fail.
    pub fn fail_container_creation(&self, name: &str) {
        self.lock().failing_container_names.insert(name.to_string());
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn reset_calls(&self) {
        self.lock().calls = CallCounts::default();
    }

    #[must_use]
    pub fn entry(&self, id: &str) -> Option<RemoteEntry> {
        self.lock().node(id).map(|n| n.entry.clone())
    }

    #[must_use]
    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.lock().node(id).map(|n| n.content.clone())
    }

    /// Children of `parent_id` in insertion order.
    #[must_use]
    pub fn children(&self, parent_id: &str) -> Vec<RemoteEntry> {
        self.lock()
            .nodes
            .iter()
            .filter(|n| n.entry.parent_ids.iter().any(|p| p == parent_id))
            .map(|n| n.entry.clone())
            .collect()
    }

    /// First child of `parent_id` named `name`.
    #[must_use]
    pub fn find_child(&self, parent_id: &str, name: &str) -> Option<RemoteEntry> {
        self.children(parent_id).into_iter().find(|e| e.name == name)
    }
}

impl RemoteStore for MemoryStore {
    async fn list_children(&self, container_id: &str) -> Result<Vec<RemoteEntry>> {
        {
            let mut state = self.lock();
            state.calls.list_children += 1;
            if state.node(container_id).is_none() {
                return Err(Error::RemoteNotFound {
                    id: container_id.to_string(),
                });
            }
        }
        Ok(self.children(container_id))
    }

    async fn get_metadata(&self, id: &str) -> Result<RemoteEntry> {
        let mut state = self.lock();
        state.calls.get_metadata += 1;
        state
            .node(id)
            .map(|n| n.entry.clone())
            .ok_or_else(|| Error::RemoteNotFound { id: id.to_string() })
    }

    async fn create_container(
        &self,
        name: &str,
        parent_id: &str,
        modified_time: DateTime<Utc>,
    ) -> Result<RemoteRef> {
        let mut state = self.lock();
        state.calls.create_container += 1;

        if state.failing_container_names.contains(name) {
            return Err(Error::Remote {
                status: 500,
                message: format!("refusing to create '{name}'"),
            });
        }
        if state.node(parent_id).is_none() {
            return Err(Error::RemoteNotFound {
                id: parent_id.to_string(),
            });
        }

        let id = state.insert(parent_id, name, RemoteKind::Container, modified_time, Vec::new());
        Ok(RemoteRef {
            id,
            name: name.to_string(),
        })
    }

    async fn upload_new(
        &self,
        local_path: &Path,
        parent_id: &str,
        metadata: &UploadMetadata,
    ) -> Result<RemoteRef> {
        let content = tokio::fs::read(local_path).await?;

        let mut state = self.lock();
        state.calls.upload_new += 1;
        let id = state.insert(
            parent_id,
            &metadata.name,
            RemoteKind::File,
            metadata.modified_time,
            content,
        );
        Ok(RemoteRef {
            id,
            name: metadata.name.clone(),
        })
    }

    async fn replace_content(
        &self,
        id: &str,
        metadata: &UploadMetadata,
        local_path: &Path,
    ) -> Result<RemoteRef> {
        let content = tokio::fs::read(local_path).await?;

        let mut state = self.lock();
        state.calls.replace_content += 1;
        let node = state
            .node_mut(id)
            .ok_or_else(|| Error::RemoteNotFound { id: id.to_string() })?;
        node.entry.size = content.len() as u64;
        node.entry.modified_time = truncate_to_millis(metadata.modified_time);
        node.content = content;

        Ok(RemoteRef {
            id: id.to_string(),
            name: node.entry.name.clone(),
        })
    }

    async fn download_content<W>(&self, id: &str, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let content = {
            let mut state = self.lock();
            state.calls.download_content += 1;
            state
                .node(id)
                .map(|n| n.content.clone())
                .ok_or_else(|| Error::RemoteNotFound { id: id.to_string() })?
        };

        sink.write_all(&content).await?;
        sink.flush().await?;
        Ok(content.len() as u64)
    }
}

fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(time.timestamp_millis()).unwrap_or(time)
}
