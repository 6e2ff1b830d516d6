//! Timestamp extraction from the fixed-width line prefix.
//!
//! Lines start with `YYYY-MM-DD HH:MM:SS,mmm`. Older emitters drop the
//! milliseconds, so the 19-character second-resolution prefix is tried when
//! the 23-character one does not parse.

use chrono::NaiveDateTime;

/// Millisecond-resolution prefix format.
pub const PRIMARY_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";
/// Second-resolution fallback format.
pub const FALLBACK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Display format of an hour bucket key.
pub const HOUR_FORMAT: &str = "%Y-%m-%d %H:00";

const PRIMARY_WIDTH: usize = 23;
const FALLBACK_WIDTH: usize = 19;

/// Parse the timestamp at the start of `raw`.
///
/// Returns `None` when neither prefix parses; callers skip such lines.
pub fn extract(raw: &str) -> Option<NaiveDateTime> {
    raw.get(..PRIMARY_WIDTH)
        .and_then(|prefix| NaiveDateTime::parse_from_str(prefix, PRIMARY_FORMAT).ok())
        .or_else(|| {
            raw.get(..FALLBACK_WIDTH)
                .and_then(|prefix| NaiveDateTime::parse_from_str(prefix, FALLBACK_FORMAT).ok())
        })
}

/// Truncate to the hour and render as a bucket key, e.g. `2025-01-01 10:00`.
pub fn hour_stamp(ts: &NaiveDateTime) -> String {
    ts.format(HOUR_FORMAT).to_string()
}
