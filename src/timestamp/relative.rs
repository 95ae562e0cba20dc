//! Relative time expressions ("3 days ago")
//!
//! Months count as 30 days and years as 365 days. The approximation is
//! intentional; results are only used as a coarse freshness signal.

use crate::snapshot::Timestamp;
use crate::timestamp::normalize::is_reasonable_at;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Units in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelativeUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
}

impl RelativeUnit {
    /// `None` when the span does not fit in a `Duration`
    fn duration(self, amount: i64) -> Option<Duration> {
        match self {
            Self::Years => amount.checked_mul(365).and_then(Duration::try_days),
            Self::Months => amount.checked_mul(30).and_then(Duration::try_days),
            Self::Weeks => Duration::try_weeks(amount),
            Self::Days => Duration::try_days(amount),
            Self::Hours => Duration::try_hours(amount),
            Self::Minutes => Duration::try_minutes(amount),
        }
    }
}

static RELATIVE_PATTERNS: LazyLock<Vec<(Regex, RelativeUnit)>> = LazyLock::new(|| {
    [
        (r"(?i)(\d+)\s*years?\s*ago", RelativeUnit::Years),
        (r"(?i)(\d+)\s*months?\s*ago", RelativeUnit::Months),
        (r"(?i)(\d+)\s*weeks?\s*ago", RelativeUnit::Weeks),
        (r"(?i)(\d+)\s*days?\s*ago", RelativeUnit::Days),
        (r"(?i)(\d+)\s*hours?\s*ago", RelativeUnit::Hours),
        (r"(?i)(\d+)\s*minutes?\s*ago", RelativeUnit::Minutes),
    ]
    .into_iter()
    .map(|(pattern, unit)| {
        (
            Regex::new(pattern).expect("hardcoded regex pattern is valid"),
            unit,
        )
    })
    .collect()
});

/// Finds the first relative expression in `text` and resolves it against `now`
///
/// Units are tried from coarsest to finest; a match that lands outside the
/// reasonable window is skipped and the next unit is tried.
pub fn parse_relative_time(text: &str, now: DateTime<Utc>) -> Option<Timestamp> {
    for (regex, unit) in RELATIVE_PATTERNS.iter() {
        let Some(caps) = regex.captures(text) else {
            continue;
        };
        let Ok(amount) = caps[1].parse::<u32>() else {
            continue;
        };
        let Some(then) = unit
            .duration(i64::from(amount))
            .and_then(|span| now.checked_sub_signed(span))
        else {
            continue;
        };
        if is_reasonable_at(then, now) {
            return Some(Timestamp::from_datetime(then));
        }
    }
    None
}
