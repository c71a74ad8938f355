//! Time utilities.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// A timestamp (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Date format used by the upstream source for calendar dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Compact date format used in cache keys.
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if a timestamp has expired (is in the past).
pub fn is_expired(expiry: Timestamp) -> bool {
    now() >= expiry
}

/// Calculate expiry time from now.
pub fn expires_in(duration: Duration) -> Timestamp {
    now() + duration
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).ok()
}
