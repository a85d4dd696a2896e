//! Date/time handling for event start times.
//!
//! Forms submit a timezone-naive `YYYY-MM-DDTHH:mm` value. It is resolved in
//! the configured IANA time zone and stored as a canonical, fixed-width UTC
//! timestamp (`YYYY-MM-DDTHH:MM:SS.mmmZ`) so that every producer agrees on a
//! single representation.

use crate::error::{Result, SharedError};
use chrono::{DateTime, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

/// Format produced by a `datetime-local` input.
pub const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

lazy_static! {
    static ref DATETIME_LOCAL_REGEX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}$").unwrap();
}

/// Parses an IANA time zone name such as `Europe/Paris`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| SharedError::InvalidDateTime(format!("unknown time zone '{}'", name)))
}

/// Returns true when `value` has the `YYYY-MM-DDTHH:mm` shape and names a real
/// calendar date and time.
pub fn is_valid_datetime_local(value: &str) -> bool {
    DATETIME_LOCAL_REGEX.is_match(value)
        && NaiveDateTime::parse_from_str(value, DATETIME_LOCAL_FORMAT).is_ok()
}

/// Resolves a datetime-local value in `tz` and returns the UTC instant.
///
/// During a DST fold the earlier instant is used; a local time that falls in a
/// DST gap does not exist and is rejected.
pub fn parse_datetime_local(value: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if !DATETIME_LOCAL_REGEX.is_match(value) {
        return Err(SharedError::InvalidDateTime(value.to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(value, DATETIME_LOCAL_FORMAT)
        .map_err(|_| SharedError::InvalidDateTime(value.to_string()))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(SharedError::InvalidDateTime(value.to_string())),
    }
}

/// Canonical persisted form of a start time.
pub fn canonical_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses any timestamp representation seen in the system: RFC 3339 with an
/// offset, or a naive date-time (with or without seconds) taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", DATETIME_LOCAL_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Rewrites a timestamp into the canonical form; unparseable input is
/// returned unchanged.
pub fn normalize_timestamp(value: &str) -> String {
    match parse_timestamp(value) {
        Some(instant) => canonical_timestamp(&instant),
        None => value.to_string(),
    }
}

/// Converts a stored timestamp into the datetime-local value shown in a form.
pub fn format_datetime_local(timestamp: &str, tz: Tz) -> Result<String> {
    let instant = parse_timestamp(timestamp)
        .ok_or_else(|| SharedError::InvalidDateTime(timestamp.to_string()))?;
    Ok(instant.with_timezone(&tz).format(DATETIME_LOCAL_FORMAT).to_string())
}
