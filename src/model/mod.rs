//! Data models for cloudsaver.
//!
//! This module contains the snapshot types both sides of a sync produce:
//! - RemoteEntry (a Drive file or folder, addressed by ID)
//! - LocalEntry (a file or directory, addressed by path)
//! - SyncRoot (the anchoring pair of folders)

pub mod entry;
pub mod root;

pub use entry::{LocalEntry, LocalKind, RemoteEntry, RemoteKind, RemoteRef, UploadMetadata};
pub use root::SyncRoot;
