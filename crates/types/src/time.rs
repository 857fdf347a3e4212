//! Store timestamp helpers

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Compact ISO form used for `__created` / `__updated` field values
pub const ISO_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Render a timestamp in the compact ISO form (`20240131T235959Z`)
#[must_use]
pub fn to_iso(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(ISO_FORMAT).to_string()
}

/// Parse a store timestamp
///
/// Accepts the compact ISO form with optional fractional seconds, a bare
/// `yyyyMMdd` date, and RFC 3339.
#[must_use]
pub fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let compact = value.trim_end_matches('Z');
    let compact = compact.split_once('.').map_or(compact, |(whole, _)| whole);
    if let Ok(naive) = NaiveDateTime::parse_from_str(compact, "%Y%m%dT%H%M%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(compact, "%Y%m%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
