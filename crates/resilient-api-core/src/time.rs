//! Wall-clock helpers.
//!
//! Control decisions inside a single process use monotonic instants. Anything
//! that is persisted or shown to an operator uses milliseconds since the Unix
//! epoch, produced here.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch for the given time.
///
/// Times before the epoch collapse to zero.
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds since the Unix epoch, now.
pub fn now_millis() -> u64 {
    unix_millis(SystemTime::now())
}

/// Converts epoch milliseconds back into a `SystemTime`.
pub fn from_unix_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}
