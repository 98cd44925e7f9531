//! In-flight operation counters.
//!
//! The tracker only observes: it reports how many jobs of each kind are
//! queued or running so a caller can draw progress and detect quiescence.
//! Concurrency is bounded elsewhere.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::Notify;

/// The three kinds of outstanding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Pull jobs (directory listings and file downloads).
    Download,
    /// New files being uploaded.
    Upload,
    /// Push directory visits, folder creation, comparisons and replacements.
    CheckOrUpdate,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InFlightSnapshot {
    pub downloads: usize,
    pub uploads: usize,
    pub checks: usize,
}

impl InFlightSnapshot {
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloads + self.uploads + self.checks
    }
}

/// Shared counters of outstanding work, owned by a sync run.
#[derive(Debug, Default)]
pub struct InFlight {
    downloads: AtomicUsize,
    uploads: AtomicUsize,
    checks: AtomicUsize,
    settled: Notify,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slot(&self, counter: Counter) -> &AtomicUsize {
        match counter {
            Counter::Download => &self.downloads,
            Counter::Upload => &self.uploads,
            Counter::CheckOrUpdate => &self.checks,
        }
    }

    /// Count one unit of work; it is released when the guard drops.
    #[must_use]
    pub fn begin(self: &Arc<Self>, counter: Counter) -> InFlightGuard {
        self.slot(counter).fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            tracker: Arc::clone(self),
            counter,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> InFlightSnapshot {
        InFlightSnapshot {
            downloads: self.downloads.load(Ordering::SeqCst),
            uploads: self.uploads.load(Ordering::SeqCst),
            checks: self.checks.load(Ordering::SeqCst),
        }
    }

    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.snapshot().total() == 0
    }

    /// Resolve once every counter is zero.
    pub async fn wait_quiescent(&self) {
        loop {
            let settled = self.settled.notified();
            if self.is_quiescent() {
                return;
            }
            settled.await;
        }
    }
}

/// Releases one unit of a counter on drop, whatever way the work ended.
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<InFlight>,
    counter: Counter,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.slot(self.counter).fetch_sub(1, Ordering::SeqCst);
        self.tracker.settled.notify_waiters();
    }
}
