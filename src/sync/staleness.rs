//! Staleness and corruption policy.
//!
//! Both passes compare modification times through [`is_fresh`] so the
//! tolerance lives in exactly one place. Drive stores times with millisecond
//! precision while local filesystems keep nanoseconds, so a file copied in
//! either direction comes back up to 1ms "older" than its source.

use chrono::{DateTime, TimeDelta, Utc};

/// Allowed clock/rounding skew between the two sides, in milliseconds.
pub const MTIME_TOLERANCE_MS: i64 = 1;

/// [`MTIME_TOLERANCE_MS`] as a duration.
#[must_use]
pub fn mtime_tolerance() -> TimeDelta {
    TimeDelta::milliseconds(MTIME_TOLERANCE_MS)
}

/// Whether `candidate` is at least as new as `reference`, within tolerance.
///
/// Pull asks `is_fresh(local, remote)`; push asks `is_fresh(remote, local)`.
#[must_use]
pub fn is_fresh(candidate: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
    candidate + mtime_tolerance() >= reference
}

/// A file reporting zero bytes is treated as unusable on either side.
#[must_use]
pub const fn is_corrupt(size: u64) -> bool {
    size == 0
}
