//! The sync engine: pull (remote → local) and push (local → remote).
//!
//! Each pass is a work queue. A job handles one directory listing or one
//! entry and returns the child jobs it discovered; the driver spawns those
//! onto a `JoinSet` and keeps draining until nothing is left, so a pass
//! returns only once its whole subtree has settled. A semaphore bounds how
//! many jobs touch the network or disk at once.
//!
//! Failures stay local to the entry that raised them: the error is logged,
//! counted in the report, and that entry's subtree is abandoned while its
//! siblings carry on. Nothing is ever deleted on either side.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::filter::{Admission, Filter};
use super::matching::{MatchPolicy, duplicate_names};
use super::staleness::{is_corrupt, is_fresh};
use super::tracker::{Counter, InFlight};
use super::types::{PassStats, PullOutcome, PushOutcome, SyncMode, SyncReport, SyncedFile};
use crate::error::{Error, Result};
use crate::local::LocalFs;
use crate::model::{LocalEntry, RemoteEntry, RemoteKind, SyncRoot, UploadMetadata};
use crate::remote::RemoteStore;

/// Default number of jobs allowed to run at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Suffix of the temporary file a download is streamed into.
pub const PARTIAL_SUFFIX: &str = ".cloudsaver-part";

/// Knobs for a [`SyncEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub concurrency: usize,
    pub filter: Filter,
    pub match_policy: MatchPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            filter: Filter::default(),
            match_policy: MatchPolicy::default(),
        }
    }
}

/// Stops a running pass and prevents later ones from starting.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// A local directory a pull walked through without creating it yet.
///
/// Only whitelist traversal produces these; they are created, outermost
/// first, once something below them is actually written.
#[derive(Debug, Clone)]
struct PendingDir {
    path: PathBuf,
    modified: DateTime<Utc>,
}

/// A unit of work in a pass.
#[derive(Debug)]
enum Job {
    PullDir {
        container_id: String,
        dir: PathBuf,
        pending: Vec<PendingDir>,
    },
    PullEntry {
        entry: RemoteEntry,
        dir: PathBuf,
        admission: Admission,
        pending: Vec<PendingDir>,
    },
    PushDir {
        dir: PathBuf,
        container_id: String,
    },
    PushEntry {
        entry: LocalEntry,
        container_id: String,
        siblings: Arc<Vec<RemoteEntry>>,
        admission: Admission,
    },
}

impl Job {
    fn counter(&self, policy: MatchPolicy) -> Counter {
        match self {
            Self::PullDir { .. } | Self::PullEntry { .. } => Counter::Download,
            Self::PushEntry {
                entry, siblings, ..
            } if entry.is_file()
                && !is_corrupt(entry.size)
                && policy.find(siblings, &entry.name, RemoteKind::File).is_none() =>
            {
                Counter::Upload
            }
            Self::PushDir { .. } | Self::PushEntry { .. } => Counter::CheckOrUpdate,
        }
    }
}

/// Mirrors a [`SyncRoot`] between a remote store and the local filesystem.
pub struct SyncEngine<R> {
    shared: Arc<Shared<R>>,
}

struct Shared<R> {
    remote: Arc<R>,
    local: LocalFs,
    root: SyncRoot,
    filter: Filter,
    policy: MatchPolicy,
    tracker: Arc<InFlight>,
    permits: Semaphore,
    cancel: Arc<watch::Sender<bool>>,
}

impl<R: RemoteStore + 'static> SyncEngine<R> {
    pub fn new(remote: Arc<R>, root: SyncRoot, options: EngineOptions) -> Self {
        let (cancel, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                remote,
                local: LocalFs,
                root,
                filter: options.filter,
                policy: options.match_policy,
                tracker: InFlight::new(),
                permits: Semaphore::new(options.concurrency.max(1)),
                cancel: Arc::new(cancel),
            }),
        }
    }

    #[must_use]
    pub fn root(&self) -> &SyncRoot {
        &self.shared.root
    }

    /// Counters of outstanding work, for progress display.
    #[must_use]
    pub fn tracker(&self) -> Arc<InFlight> {
        Arc::clone(&self.shared.tracker)
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.shared.cancel),
        }
    }

    /// Check that the remote root exists and is a container.
    ///
    /// # Errors
    ///
    /// Returns `RemoteNotFound`, `NotAContainer`, or the transport error that
    /// prevented the lookup.
    pub async fn verify_root(&self) -> Result<RemoteEntry> {
        let entry = self
            .shared
            .remote
            .get_metadata(&self.shared.root.remote_id)
            .await?;

        if !entry.is_container() {
            return Err(Error::NotAContainer {
                id: entry.id,
                name: entry.name,
            });
        }
        Ok(entry)
    }

    /// Run the passes selected by `mode` on the sync root.
    ///
    /// Push runs first so that a following pull sees local edits as current.
    pub async fn run(&self, mode: SyncMode) -> SyncReport {
        let root = &self.shared.root;
        let mut report: Option<SyncReport> = None;

        if self.shared.filter.is_whitelist() {
            info!(filter = ?self.shared.filter, "Whitelist active, only matching paths are synced");
        }

        if mode.pushes() {
            info!(local = %root.local.display(), remote = %root.remote_id, "Push enabled");
            report = Some(self.push(&root.local, &root.remote_id).await);
        }

        if mode.pulls() && !report.as_ref().is_some_and(|r| r.cancelled) {
            info!(local = %root.local.display(), remote = %root.remote_id, "Pull enabled");
            let pulled = self.pull(&root.remote_id, &root.local).await;
            report = Some(match report {
                Some(pushed) => pushed.merge(pulled),
                None => pulled,
            });
        }

        report.unwrap_or_default()
    }

    /// Mirror a remote container into a local directory.
    pub async fn pull(&self, remote_container_id: &str, local_dir: &Path) -> SyncReport {
        self.drive(
            SyncMode::Pull,
            Job::PullDir {
                container_id: remote_container_id.to_string(),
                dir: local_dir.to_path_buf(),
                pending: Vec::new(),
            },
        )
        .await
    }

    /// Mirror a local directory into a remote container.
    pub async fn push(&self, local_dir: &Path, remote_container_id: &str) -> SyncReport {
        self.drive(
            SyncMode::Push,
            Job::PushDir {
                dir: local_dir.to_path_buf(),
                container_id: remote_container_id.to_string(),
            },
        )
        .await
    }

    async fn drive(&self, mode: SyncMode, first: Job) -> SyncReport {
        let started = Instant::now();
        let stats = Arc::new(PassStats::default());
        let mut cancel_rx = self.shared.cancel.subscribe();
        let mut cancelled = *cancel_rx.borrow_and_update();
        let mut tasks: JoinSet<Vec<Job>> = JoinSet::new();

        if cancelled {
            warn!(%mode, "Sync cancelled before start");
        } else {
            self.spawn(&mut tasks, &stats, first);
        }

        while !tasks.is_empty() {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(children)) if !cancelled => {
                        for job in children {
                            self.spawn(&mut tasks, &stats, job);
                        }
                    }
                    Some(Ok(_)) | None => {}
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => {
                        error!(error = %e, "Sync job panicked");
                        PassStats::bump(&stats.failed);
                    }
                },
                changed = cancel_rx.changed(), if !cancelled => {
                    if changed.is_err() || *cancel_rx.borrow_and_update() {
                        warn!(%mode, pending = tasks.len(), "Sync cancelled, aborting pending work");
                        cancelled = true;
                        tasks.abort_all();
                    }
                }
            }
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = stats.report(mode, cancelled, elapsed_ms);
        debug!(?report, "Pass finished");
        report
    }

    fn spawn(&self, tasks: &mut JoinSet<Vec<Job>>, stats: &Arc<PassStats>, job: Job) {
        let guard = self.shared.tracker.begin(job.counter(self.shared.policy));
        let shared = Arc::clone(&self.shared);
        let stats = Arc::clone(stats);

        tasks.spawn(async move {
            let _guard = guard;
            let Ok(_permit) = shared.permits.acquire().await else {
                return Vec::new();
            };
            shared.run_job(job, &stats).await
        });
    }
}

impl<R: RemoteStore> Shared<R> {
    async fn run_job(&self, job: Job, stats: &PassStats) -> Vec<Job> {
        let (path, result) = match job {
            Job::PullDir {
                container_id,
                dir,
                pending,
            } => {
                let result = self.pull_dir(&container_id, &dir, &pending, stats).await;
                (dir, result)
            }
            Job::PullEntry {
                entry,
                dir,
                admission,
                pending,
            } => {
                let target = dir.join(&entry.name);
                let result = self.pull_entry(&entry, &target, admission, pending, stats).await;
                (target, result)
            }
            Job::PushDir { dir, container_id } => {
                let result = self.push_dir(&dir, &container_id).await;
                (dir, result)
            }
            Job::PushEntry {
                entry,
                container_id,
                siblings,
                admission,
            } => {
                let result = self
                    .push_entry(&entry, &container_id, &siblings, admission, stats)
                    .await;
                (entry.full_path, result)
            }
        };

        result.unwrap_or_else(|e| {
            warn!(path = %self.root.display_path(&path), error = %e, "Entry failed, skipping its subtree");
            PassStats::bump(&stats.failed);
            Vec::new()
        })
    }

    fn classify(&self, path: &Path, is_dir: bool) -> Admission {
        let rel = path.strip_prefix(&self.root.local).unwrap_or(path);
        self.filter.classify(rel, is_dir)
    }

    fn warn_duplicates(&self, dir: &Path, siblings: &[RemoteEntry]) {
        for (name, count) in duplicate_names(siblings) {
            warn!(
                folder = %self.root.display_path(dir),
                name,
                count,
                "Remote folder holds several entries with the same name, using the first"
            );
        }
    }

    // ── Pull ──────────────────────────────────────────────────

    async fn pull_dir(
        &self,
        container_id: &str,
        dir: &Path,
        pending: &[PendingDir],
        stats: &PassStats,
    ) -> Result<Vec<Job>> {
        let entries = self.remote.list_children(container_id).await?;
        self.warn_duplicates(dir, &entries);

        let mut jobs = Vec::with_capacity(entries.len());
        for entry in &entries {
            if !is_plain_name(&entry.name) {
                warn!(
                    folder = %self.root.display_path(dir),
                    name = %entry.name,
                    "Remote name cannot be used as a local file name, skipping"
                );
                PassStats::bump(&stats.failed);
                continue;
            }

            let shadowed = self
                .policy
                .find(&entries, &entry.name, entry.kind)
                .is_some_and(|first| first.id != entry.id);
            if shadowed {
                debug!(folder = %self.root.display_path(dir), id = %entry.id, "Skipping shadowed duplicate");
                continue;
            }

            let admission = self.classify(&dir.join(&entry.name), entry.is_container());
            if admission == Admission::Reject {
                continue;
            }
            jobs.push(Job::PullEntry {
                entry: entry.clone(),
                dir: dir.to_path_buf(),
                admission,
                pending: pending.to_vec(),
            });
        }
        Ok(jobs)
    }

    async fn pull_entry(
        &self,
        entry: &RemoteEntry,
        target: &Path,
        admission: Admission,
        mut pending: Vec<PendingDir>,
        stats: &PassStats,
    ) -> Result<Vec<Job>> {
        if !entry.is_container() {
            let outcome = self.pull_file(entry, target, &pending, stats).await?;
            stats.record_pull(&outcome);
            return Ok(Vec::new());
        }

        match self.local.stat(target).await? {
            Some(existing) if existing.is_dir() => {}
            Some(_) => {
                return Err(Error::Other(
                    "remote folder collides with a local file".to_string(),
                ));
            }
            None if admission == Admission::Traverse => {
                pending.push(PendingDir {
                    path: target.to_path_buf(),
                    modified: entry.modified_time,
                });
                return Ok(vec![Job::PullDir {
                    container_id: entry.id.clone(),
                    dir: target.to_path_buf(),
                    pending,
                }]);
            }
            None => {
                self.create_pending(&pending, stats).await?;
                self.create_local_dir(target, entry.modified_time, stats).await?;
            }
        }

        Ok(vec![Job::PullDir {
            container_id: entry.id.clone(),
            dir: target.to_path_buf(),
            pending: Vec::new(),
        }])
    }

    async fn pull_file(
        &self,
        entry: &RemoteEntry,
        target: &Path,
        pending: &[PendingDir],
        stats: &PassStats,
    ) -> Result<PullOutcome> {
        if is_corrupt(entry.size) {
            warn!(path = %self.root.display_path(target), id = %entry.id, "Remote file is empty, treating as corrupted");
            return Ok(PullOutcome::Corrupted);
        }

        if let Some(local) = self.local.stat(target).await? {
            if local.is_dir() {
                return Err(Error::Other(
                    "remote file collides with a local directory".to_string(),
                ));
            }
            if !is_corrupt(local.size) && is_fresh(local.modified, entry.modified_time) {
                debug!(path = %self.root.display_path(target), "Local file is current");
                return Ok(PullOutcome::UpToDate);
            }
        }

        self.create_pending(pending, stats).await?;
        let bytes = self.download(entry, target).await?;

        if bytes != entry.size {
            warn!(path = %self.root.display_path(target), expected = entry.size, bytes, "Downloaded size differs from remote metadata");
        }
        info!(path = %self.root.display_path(target), bytes, "Downloaded file");

        Ok(PullOutcome::Downloaded(SyncedFile {
            remote: entry.clone(),
            local_path: target.to_path_buf(),
        }))
    }

    async fn download(&self, entry: &RemoteEntry, target: &Path) -> Result<u64> {
        let partial = PartialFile::new(partial_path(target, entry));
        let mut file = self.local.open_write(partial.path()).await?;
        let bytes = self.remote.download_content(&entry.id, &mut file).await?;
        file.sync_all().await?;
        drop(file);

        self.local.set_mtime(partial.path(), entry.modified_time).await?;
        self.local.rename(partial.path(), target).await?;
        partial.persist();
        Ok(bytes)
    }

    async fn create_pending(&self, pending: &[PendingDir], stats: &PassStats) -> Result<()> {
        for dir in pending {
            self.create_local_dir(&dir.path, dir.modified, stats).await?;
        }
        Ok(())
    }

    /// Create one directory and stamp its mtime. A directory that already
    /// exists (created by a sibling job) is left alone.
    async fn create_local_dir(&self, path: &Path, modified: DateTime<Utc>, stats: &PassStats) -> Result<()> {
        match self.local.create_dir(path).await {
            Ok(()) => {
                self.local.set_mtime(path, modified).await?;
                PassStats::bump(&stats.dirs_created);
                info!(path = %self.root.display_path(path), "Created folder");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // ── Push ──────────────────────────────────────────────────

    async fn push_dir(&self, dir: &Path, container_id: &str) -> Result<Vec<Job>> {
        debug!(path = %self.root.display_path(dir), "Checking folder");
        let siblings = Arc::new(self.remote.list_children(container_id).await?);
        self.warn_duplicates(dir, &siblings);

        let mut jobs = Vec::new();
        for entry in self.local.list_dir(dir).await? {
            if entry.name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            let admission = self.classify(&entry.full_path, entry.is_dir());
            if admission == Admission::Reject {
                continue;
            }
            jobs.push(Job::PushEntry {
                entry,
                container_id: container_id.to_string(),
                siblings: Arc::clone(&siblings),
                admission,
            });
        }
        Ok(jobs)
    }

    async fn push_entry(
        &self,
        entry: &LocalEntry,
        container_id: &str,
        siblings: &[RemoteEntry],
        admission: Admission,
        stats: &PassStats,
    ) -> Result<Vec<Job>> {
        if !entry.is_dir() {
            let outcome = self.push_file(entry, container_id, siblings).await?;
            stats.record_push(&outcome);
            return Ok(Vec::new());
        }

        let folder_id = match self.policy.find(siblings, &entry.name, RemoteKind::Container) {
            Some(existing) => existing.id.clone(),
            None => {
                if admission == Admission::Traverse && !self.has_match_below(&entry.full_path).await? {
                    debug!(path = %self.root.display_path(&entry.full_path), "No whitelisted entries below, not creating remote folder");
                    return Ok(Vec::new());
                }
                let created = self
                    .remote
                    .create_container(&entry.name, container_id, entry.modified)
                    .await?;
                PassStats::bump(&stats.containers_created);
                info!(path = %self.root.display_path(&entry.full_path), id = %created.id, "Created remote folder");
                created.id
            }
        };

        Ok(vec![Job::PushDir {
            dir: entry.full_path.clone(),
            container_id: folder_id,
        }])
    }

    /// Whether anything below a traversed directory would be pushed.
    async fn has_match_below(&self, dir: &Path) -> Result<bool> {
        let mut stack = vec![dir.to_path_buf()];

        while let Some(current) = stack.pop() {
            for child in self.local.list_dir(&current).await? {
                if child.name.ends_with(PARTIAL_SUFFIX) {
                    continue;
                }
                match self.classify(&child.full_path, child.is_dir()) {
                    Admission::Match if child.is_dir() || !is_corrupt(child.size) => return Ok(true),
                    Admission::Traverse => stack.push(child.full_path),
                    Admission::Match | Admission::Reject => {}
                }
            }
        }
        Ok(false)
    }

    async fn push_file(
        &self,
        entry: &LocalEntry,
        container_id: &str,
        siblings: &[RemoteEntry],
    ) -> Result<PushOutcome> {
        let path = self.root.display_path(&entry.full_path);

        if is_corrupt(entry.size) {
            warn!(path = %path, "Local file is empty, treating as corrupted");
            return Ok(PushOutcome::Corrupted);
        }

        let metadata = UploadMetadata {
            name: entry.name.clone(),
            modified_time: entry.modified,
        };

        match self.policy.find(siblings, &entry.name, RemoteKind::File) {
            None => {
                let created = self
                    .remote
                    .upload_new(&entry.full_path, container_id, &metadata)
                    .await?;
                info!(path = %path, id = %created.id, "Uploaded file");
                Ok(PushOutcome::Uploaded { id: created.id })
            }
            Some(remote) if !is_corrupt(remote.size) && is_fresh(remote.modified_time, entry.modified) => {
                debug!(path = %path, "Remote file is current");
                Ok(PushOutcome::UpToDate)
            }
            Some(remote) => {
                let updated = self
                    .remote
                    .replace_content(&remote.id, &metadata, &entry.full_path)
                    .await?;
                info!(path = %path, id = %updated.id, "Updated file");
                Ok(PushOutcome::Replaced { id: updated.id })
            }
        }
    }
}

/// Whether a remote name maps to exactly one local path component.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
        && !name.contains('\\')
}

/// Temporary download target, unique per remote entry.
fn partial_path(target: &Path, entry: &RemoteEntry) -> PathBuf {
    target.with_file_name(format!(".{}.{}{PARTIAL_SUFFIX}", entry.name, entry.id))
}

/// Removes a partially downloaded file unless [`PartialFile::persist`] is
/// called, including when the download task is aborted.
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persist(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial download");
            }
        }
    }
}
