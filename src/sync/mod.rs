//! Tree mirroring between a remote container and a local directory.
//!
//! - **Pull**: remote → local. Missing folders are created, files are
//!   downloaded when the local copy is absent, empty, or older.
//! - **Push**: local → remote. Missing folders are created, new files are
//!   uploaded and older remote files have their content replaced in place.
//!
//! Neither direction deletes anything. Staleness is decided from
//! modification times alone (see [`is_fresh`]), and a zero-byte file on
//! either side is treated as corrupted: never propagated, always
//! overwritable.
//!
//! # Example
//!
//! ```ignore
//! use cloudsaver::remote::DriveClient;
//! use cloudsaver::sync::{EngineOptions, SyncEngine, SyncMode};
//!
//! let engine = SyncEngine::new(Arc::new(client), root, EngineOptions::default());
//! engine.verify_root().await?;
//! let report = engine.run(SyncMode::Both).await;
//! ```

mod engine;
mod filter;
mod matching;
mod staleness;
mod tracker;
mod types;

pub use engine::{CancelHandle, DEFAULT_CONCURRENCY, EngineOptions, PARTIAL_SUFFIX, SyncEngine};
pub use filter::{Admission, Filter, LEGACY_MARKER};
pub use matching::{MatchPolicy, duplicate_names};
pub use staleness::{MTIME_TOLERANCE_MS, is_corrupt, is_fresh, mtime_tolerance};
pub use tracker::{Counter, InFlight, InFlightGuard, InFlightSnapshot};
pub use types::{PullOutcome, PushOutcome, SyncMode, SyncReport, SyncedFile};
