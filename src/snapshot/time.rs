//! Canonical UTC timestamps
//!
//! Every timestamp the engine stores or compares is a [`Timestamp`]: a UTC
//! instant truncated to whole seconds whose text form is always
//! `"YYYY-MM-DD HH:MM:SS UTC"`.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// strftime pattern of the canonical form
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// A UTC instant with second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wraps a UTC datetime, dropping sub-second precision
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// The current instant
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Parses the canonical `"YYYY-MM-DD HH:MM:SS UTC"` form only
    pub fn parse_canonical(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| Self(Utc.from_utc_datetime(&naive)))
    }

    /// Returns the wrapped datetime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Time elapsed from `earlier` to `self` (negative if `earlier` is later)
    pub fn since(&self, earlier: &Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// Shifts the timestamp back by the given duration
    pub fn minus(&self, duration: Duration) -> Self {
        Self(self.0 - duration)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let naive = NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)?;
        Ok(Self(Utc.from_utc_datetime(&naive)))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
