//! Timestamp normalization
//!
//! Turns the many date spellings found on the web into a canonical
//! [`Timestamp`]. Parsing is total: anything unrecognized, or outside the
//! reasonable window, yields `None`.

use crate::snapshot::Timestamp;
use crate::timestamp::relative::parse_relative_time;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Earliest instant considered plausible for a web page update
pub fn earliest_reasonable() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

static AGO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bago\b").expect("hardcoded regex pattern is valid"));

static ZONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(UTC|GMT|UT|EST|EDT|CST|CDT|MST|MDT|PST|PDT)\b")
        .expect("hardcoded regex pattern is valid")
});

static TRAILING_Z_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)[zZ]$").expect("hardcoded regex pattern is valid"));

/// Formats carrying an explicit numeric offset (applied after zone substitution)
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M %z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%A, %d-%b-%y %H:%M:%S %z",
];

/// Formats without zone information, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%a, %d %b %Y %H:%M:%S",
];

/// Date-only formats, interpreted as midnight UTC
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%a, %d %b %Y",
];

/// Fixed UTC offset for a known zone abbreviation
fn zone_offset(abbrev: &str) -> &'static str {
    match abbrev.to_ascii_uppercase().as_str() {
        "EST" => "-05:00",
        "EDT" => "-04:00",
        "CST" => "-06:00",
        "CDT" => "-05:00",
        "MST" => "-07:00",
        "MDT" => "-06:00",
        "PST" => "-08:00",
        "PDT" => "-07:00",
        _ => "+00:00",
    }
}

/// Replaces zone abbreviations and a trailing `Z` with numeric offsets
fn substitute_zones(raw: &str) -> String {
    let replaced = ZONE_REGEX.replace_all(raw, |caps: &regex::Captures<'_>| {
        zone_offset(&caps[1]).to_string()
    });
    TRAILING_Z_REGEX
        .replace(&replaced, "${1}+00:00")
        .into_owned()
}

/// Parses a raw timestamp into a UTC datetime without any bounds check
///
/// `now` anchors relative expressions such as "3 days ago".
pub fn parse_timestamp_at(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if AGO_REGEX.is_match(trimmed) {
        return parse_relative_time(trimmed, now).map(|ts| ts.as_datetime());
    }

    if let Some(ts) = Timestamp::parse_canonical(trimmed) {
        return Some(ts.as_datetime());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let substituted = substitute_zones(trimmed);

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&substituted, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&substituted, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&substituted, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
    }

    None
}

/// Returns true if `dt` lies within `[1990-01-01, now + 1 day]`
pub fn is_reasonable_at(dt: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    dt >= earliest_reasonable() && dt <= now + Duration::days(1)
}

/// Returns true if the timestamp is plausible relative to the current time
pub fn is_reasonable(ts: &Timestamp) -> bool {
    is_reasonable_at(ts.as_datetime(), Utc::now())
}

/// Normalizes a raw timestamp relative to `now`
pub fn normalize_timestamp_at(raw: &str, now: DateTime<Utc>) -> Option<Timestamp> {
    parse_timestamp_at(raw, now)
        .filter(|dt| is_reasonable_at(*dt, now))
        .map(Timestamp::from_datetime)
}

/// Normalizes a raw timestamp to the canonical UTC form
///
/// # Examples
///
/// ```
/// use sumi_freshness::timestamp::normalize_timestamp;
///
/// let ts = normalize_timestamp("2024-02-01T12:30:00+02:00").unwrap();
/// assert_eq!(ts.to_string(), "2024-02-01 10:30:00 UTC");
///
/// assert!(normalize_timestamp("not a date").is_none());
/// assert!(normalize_timestamp("1985-06-01").is_none());
/// ```
pub fn normalize_timestamp(raw: &str) -> Option<Timestamp> {
    normalize_timestamp_at(raw, Utc::now())
}
