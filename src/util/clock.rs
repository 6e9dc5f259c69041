//! Wall-clock helpers. All timestamps are UTC.

use chrono::{DateTime, Utc};

/// ISO-8601 timestamp with microseconds and a `Z` suffix, as stored in result records.
pub fn record_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// ISO-8601 timestamp truncated to seconds with a `Z` suffix.
pub fn seconds_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Compact `YYYYmmdd-HHMMSS` stamp used in generated file names.
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Current time in UTC.
pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}
