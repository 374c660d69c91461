//! Clocks and timestamp arithmetic
//!
//! The orchestrator reads "now" through [`TimeSource`]. The live service uses
//! [`SystemTime`]; tests and replays drive a [`FixedTime`] by hand.
//!
//! All timestamps are UTC milliseconds since the Unix epoch. Sensor feeds
//! deliver the same representation, so track ages and cycle times can be
//! compared directly.

use chrono::{DateTime, TimeZone, Utc};

use crate::constants::time::MS_PER_SECOND;

/// Timestamp in milliseconds since the Unix epoch (UTC)
pub type Timestamp = u64;

/// Where the fusion cycle gets its notion of "now"
pub trait TimeSource {
    /// Current timestamp (ms since the Unix epoch)
    fn now(&self) -> Timestamp;

    /// False for clocks that only move when told to
    fn is_wall_clock(&self) -> bool;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Manually driven clock for tests and replay
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock stopped at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to `timestamp`
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp = self.timestamp.saturating_add(ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Signed elapsed time between two timestamps, in milliseconds.
///
/// Negative when `later` is actually earlier (out-of-order input). Saturates
/// at the `i64` range instead of wrapping.
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> i64 {
    let diff = i128::from(later) - i128::from(earlier);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

/// Signed elapsed time between two timestamps, in seconds.
pub fn elapsed_secs(earlier: Timestamp, later: Timestamp) -> f64 {
    elapsed_ms(earlier, later) as f64 / MS_PER_SECOND as f64
}

/// Convert seconds (configuration units) into a millisecond span.
pub fn secs_to_ms(secs: f64) -> u64 {
    if secs <= 0.0 {
        return 0;
    }
    (secs * MS_PER_SECOND as f64).round() as u64
}

/// Convert a timestamp into a UTC date-time for published messages.
pub fn to_datetime(timestamp: Timestamp) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(timestamp as i64)
        .single()
        .unwrap_or_default()
}
