//! Sync types: run modes, per-entry outcomes and pass reports.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::model::RemoteEntry;

/// Which passes a run performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Remote → local only.
    Pull,
    /// Local → remote only.
    Push,
    /// Push, then pull.
    #[default]
    Both,
}

impl SyncMode {
    #[must_use]
    pub const fn pushes(self) -> bool {
        matches!(self, Self::Push | Self::Both)
    }

    #[must_use]
    pub const fn pulls(self) -> bool {
        matches!(self, Self::Pull | Self::Both)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
            Self::Both => write!(f, "sync"),
        }
    }
}

/// A remote file merged with the local path it was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedFile {
    pub remote: RemoteEntry,
    pub local_path: PathBuf,
}

/// Result of pulling one remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Downloaded(SyncedFile),
    UpToDate,
    Corrupted,
}

/// Result of pushing one local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Uploaded { id: String },
    Replaced { id: String },
    UpToDate,
    Corrupted,
}

/// Counters of one pass, updated concurrently by jobs.
#[derive(Debug, Default)]
pub(crate) struct PassStats {
    pub downloaded: AtomicUsize,
    pub uploaded: AtomicUsize,
    pub replaced: AtomicUsize,
    pub dirs_created: AtomicUsize,
    pub containers_created: AtomicUsize,
    pub up_to_date: AtomicUsize,
    pub corrupted: AtomicUsize,
    pub failed: AtomicUsize,
}

impl PassStats {
    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pull(&self, outcome: &PullOutcome) {
        match outcome {
            PullOutcome::Downloaded(_) => Self::bump(&self.downloaded),
            PullOutcome::UpToDate => Self::bump(&self.up_to_date),
            PullOutcome::Corrupted => Self::bump(&self.corrupted),
        }
    }

    pub fn record_push(&self, outcome: &PushOutcome) {
        match outcome {
            PushOutcome::Uploaded { .. } => Self::bump(&self.uploaded),
            PushOutcome::Replaced { .. } => Self::bump(&self.replaced),
            PushOutcome::UpToDate => Self::bump(&self.up_to_date),
            PushOutcome::Corrupted => Self::bump(&self.corrupted),
        }
    }

    pub fn report(&self, mode: SyncMode, cancelled: bool, elapsed_ms: u64) -> SyncReport {
        SyncReport {
            mode,
            downloaded: self.downloaded.load(Ordering::Relaxed),
            uploaded: self.uploaded.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            dirs_created: self.dirs_created.load(Ordering::Relaxed),
            containers_created: self.containers_created.load(Ordering::Relaxed),
            up_to_date: self.up_to_date.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled,
            elapsed_ms,
        }
    }
}

/// Summary of a completed (or cancelled) pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    /// Files written locally.
    pub downloaded: usize,
    /// Files created remotely.
    pub uploaded: usize,
    /// Remote files whose content was replaced.
    pub replaced: usize,
    /// Local directories created.
    pub dirs_created: usize,
    /// Remote folders created.
    pub containers_created: usize,
    /// Files skipped because the destination was already current.
    pub up_to_date: usize,
    /// Zero-byte files skipped.
    pub corrupted: usize,
    /// Entries whose processing failed; their subtrees were abandoned.
    pub failed: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl SyncReport {
    /// Number of write operations performed on either side.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.downloaded + self.uploaded + self.replaced + self.dirs_created + self.containers_created
    }

    /// Fold a later pass into this one (used for push-then-pull runs).
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            mode: SyncMode::Both,
            downloaded: self.downloaded + other.downloaded,
            uploaded: self.uploaded + other.uploaded,
            replaced: self.replaced + other.replaced,
            dirs_created: self.dirs_created + other.dirs_created,
            containers_created: self.containers_created + other.containers_created,
            up_to_date: self.up_to_date + other.up_to_date,
            corrupted: self.corrupted + other.corrupted,
            failed: self.failed + other.failed,
            cancelled: self.cancelled || other.cancelled,
            elapsed_ms: self.elapsed_ms + other.elapsed_ms,
        }
    }
}
