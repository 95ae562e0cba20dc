//! RSS and Atom timestamp extraction
//!
//! Feeds are scanned with targeted patterns rather than a full XML parser:
//! only the root element and a handful of date elements matter.

use crate::snapshot::Timestamp;
use crate::timestamp::normalize_timestamp_at;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static ATOM_ROOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:<\?xml[^>]*\?>\s*)?(?:<!--.*?-->\s*)*(?:<\?[^>]*\?>\s*)*<(?:[a-z0-9_]+:)?feed[\s>]")
        .expect("hardcoded regex pattern is valid")
});

static ATOM_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[a-z0-9_]+:)?(?:updated|published)(?:\s[^>]*)?>(.*?)</")
        .expect("hardcoded regex pattern is valid")
});

static LAST_BUILD_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<lastBuildDate(?:\s[^>]*)?>(.*?)</lastBuildDate>")
        .expect("hardcoded regex pattern is valid")
});

static ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<item(?:\s[^>]*)?>(.*?)</item>").expect("hardcoded regex pattern is valid")
});

static ITEM_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[a-z0-9_]+:)?(?:pubDate|date)(?:\s[^>]*)?>(.*?)</")
        .expect("hardcoded regex pattern is valid")
});

/// True if a fetched body looks like an RSS or Atom document
pub fn looks_like_feed(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("<rss") || lower.contains("<feed")
}

fn clean_text(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .trim()
        .to_string()
}

/// Raw date strings found in a feed
///
/// Atom feeds contribute every `updated`/`published`; RSS feeds contribute
/// the channel `lastBuildDate` and each item's `pubDate`, `date` or `dc:date`.
pub fn feed_time_candidates(xml: &str) -> Vec<String> {
    if ATOM_ROOT_REGEX.is_match(xml) {
        return ATOM_DATE_REGEX
            .captures_iter(xml)
            .map(|caps| clean_text(&caps[1]))
            .filter(|text| !text.is_empty())
            .collect();
    }

    let mut times: Vec<String> = LAST_BUILD_DATE_REGEX
        .captures(xml)
        .map(|caps| clean_text(&caps[1]))
        .into_iter()
        .collect();

    for item in ITEM_REGEX.captures_iter(xml) {
        times.extend(
            ITEM_DATE_REGEX
                .captures_iter(&item[1])
                .map(|caps| clean_text(&caps[1])),
        );
    }

    times.retain(|text| !text.is_empty());
    times
}

/// Latest valid, reasonable instant in a feed
pub fn latest_feed_time_at(xml: &str, now: DateTime<Utc>) -> Option<Timestamp> {
    feed_time_candidates(xml)
        .iter()
        .filter_map(|raw| normalize_timestamp_at(raw, now))
        .max()
}
