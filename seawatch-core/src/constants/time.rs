//! Time-Related Constants
//!
//! This module defines unit conversions and scheduling intervals used by the
//! fusion cycle and the track lifecycle.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Milliseconds per minute.
pub const MS_PER_MINUTE: u64 = MS_PER_SECOND * SECONDS_PER_MINUTE;

/// Latest timestamp an observation may carry (milliseconds).
///
/// Elapsed times are signed 64-bit, so both ends of a difference must fit.
pub const MAX_TIMESTAMP_MS: u64 = i64::MAX as u64;

// ===== FUSION CYCLE =====

/// Default fusion cycle interval (milliseconds).
///
/// Upper bound on the staleness of published state: a heartbeat leaves
/// at least this often even when no observation arrives.
///
/// Source: Original fusion service cadence (2 s)
pub const DEFAULT_CYCLE_INTERVAL_MS: u64 = 2000;

/// Shortest accepted fusion cycle interval (milliseconds).
///
/// Shorter intervals turn the heartbeat into a busy loop on the
/// publishing transport.
pub const MIN_CYCLE_INTERVAL_MS: u64 = 50;
