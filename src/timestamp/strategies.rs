//! Timestamp extraction strategies
//!
//! Each strategy is a pure function from a parsed page to an optional raw
//! timestamp string. The resolver composes them into ordered lists and
//! normalizes whatever they return.

use crate::snapshot::{Timestamp, TimestampSource};
use crate::timestamp::normalize::{is_reasonable_at, parse_timestamp_at};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Raw markup together with its parsed DOM
pub struct PageView<'a> {
    pub raw: &'a str,
    pub document: Html,
}

impl<'a> PageView<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            document: Html::parse_document(raw),
        }
    }
}

/// A named extraction step tagged with the source it reports
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub source: TimestampSource,
    pub extract: fn(&PageView<'_>) -> Option<String>,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Strategies tried before the feed signal
pub const PRIMARY_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "json_ld_date_modified",
        source: TimestampSource::Schema,
        extract: json_ld_date_modified,
    },
    Strategy {
        name: "microdata_date_modified",
        source: TimestampSource::Schema,
        extract: microdata_date_modified,
    },
    Strategy {
        name: "article_modified_time",
        source: TimestampSource::Og,
        extract: article_modified_time,
    },
    Strategy {
        name: "og_updated_time",
        source: TimestampSource::Og,
        extract: og_updated_time,
    },
    Strategy {
        name: "article_published_time",
        source: TimestampSource::Og,
        extract: article_published_time,
    },
];

/// Strategies tried after the feed signal
pub const SECONDARY_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "time_datetime",
        source: TimestampSource::Visible,
        extract: time_datetime,
    },
    Strategy {
        name: "date_classed_element",
        source: TimestampSource::Visible,
        extract: date_classed_element,
    },
    Strategy {
        name: "updated_label",
        source: TimestampSource::Visible,
        extract: updated_label,
    },
    Strategy {
        name: "meta_name",
        source: TimestampSource::MetaTag,
        extract: meta_name_fallback,
    },
    Strategy {
        name: "meta_property",
        source: TimestampSource::MetaTag,
        extract: meta_property_fallback,
    },
    Strategy {
        name: "meta_http_equiv",
        source: TimestampSource::MetaTag,
        extract: meta_http_equiv,
    },
    Strategy {
        name: "quoted_json_key",
        source: TimestampSource::ContentExtraction,
        extract: quoted_json_key,
    },
    Strategy {
        name: "labeled_date_line",
        source: TimestampSource::ContentExtraction,
        extract: labeled_date_line,
    },
    Strategy {
        name: "relative_expression",
        source: TimestampSource::ContentExtraction,
        extract: relative_expression,
    },
];

static UPDATED_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:last updated|updated|modified)[^:<\n]{0,30}:\s*([^\n\r<]+)")
        .expect("hardcoded regex pattern is valid")
});

static QUOTED_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:dateModified|lastModified|updated|modified)"\s*:\s*"([^"]+)""#)
        .expect("hardcoded regex pattern is valid")
});

static LABELED_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:last updated|last modified|last changed|revision date|update date|updated|modified):\s*([^\n\r<(]+)",
    )
    .expect("hardcoded regex pattern is valid")
});

static RELATIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s*(?:years?|months?|weeks?|days?|hours?|minutes?)\s*ago")
        .expect("hardcoded regex pattern is valid")
});

static PAGE_DATE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:Z|[+-]\d{2}:\d{2})",
        r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\b",
        r"(?i)\b(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun), \d{1,2} (?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) \d{4} \d{2}:\d{2}:\d{2} GMT\b",
        r"\b\d{1,2}/\d{1,2}/\d{4}\b",
        r"\b\d{4}-\d{2}-\d{2}\b",
        r"(?i)\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{1,2},? \d{4}\b",
        r"(?i)\b\d{1,2} (?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{4}\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("hardcoded regex pattern is valid"))
    .collect()
});

/// First `dateModified` found in JSON-LD blocks (top level, arrays, `@graph`)
fn json_ld_date_modified(page: &PageView<'_>) -> Option<String> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for element in page.document.select(&selector) {
        let body = element.text().collect::<String>();
        let Some(data) = parse_json_ld(&body) else {
            continue;
        };
        if let Some(found) = find_json_ld_key(&data, "dateModified") {
            return Some(found);
        }
    }
    None
}

/// Parses a JSON-LD script body, tolerating comment and CDATA wrappers
pub(crate) fn parse_json_ld(body: &str) -> Option<serde_json::Value> {
    let cleaned = body
        .trim()
        .trim_start_matches("<!--")
        .trim_end_matches("-->")
        .trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>");
    serde_json::from_str(cleaned.trim()).ok()
}

/// Looks up a string key at the top level, one level of array nesting, or in `@graph`
pub(crate) fn find_json_ld_key(data: &serde_json::Value, key: &str) -> Option<String> {
    match data {
        serde_json::Value::Object(map) => {
            if let Some(value) = map.get(key).and_then(|v| v.as_str()) {
                return Some(value.to_string());
            }
            map.get("@graph")
                .and_then(|graph| graph.as_array())
                .and_then(|items| {
                    items
                        .iter()
                        .find_map(|item| item.get(key).and_then(|v| v.as_str()))
                })
                .map(str::to_string)
        }
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|item| item.get(key).and_then(|v| v.as_str()))
            .map(str::to_string),
        _ => None,
    }
}

fn microdata_date_modified(page: &PageView<'_>) -> Option<String> {
    let selector = Selector::parse("[itemprop]").ok()?;
    page.document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("itemprop")
                .map(|p| p.eq_ignore_ascii_case("dateModified"))
                .unwrap_or(false)
        })
        .find_map(|el| {
            el.value()
                .attr("content")
                .or_else(|| el.value().attr("datetime"))
                .map(|v| v.trim().to_string())
        })
}

/// `content` of the first `<meta>` whose `attr` equals `name` (case-insensitive)
pub(crate) fn meta_content(document: &Html, attr: &str, name: &str) -> Option<String> {
    let selector = Selector::parse("meta").ok()?;
    document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr(attr)
                .map(|v| v.trim().eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .find_map(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn article_modified_time(page: &PageView<'_>) -> Option<String> {
    meta_content(&page.document, "property", "article:modified_time")
}

fn og_updated_time(page: &PageView<'_>) -> Option<String> {
    meta_content(&page.document, "property", "og:updated_time")
}

fn article_published_time(page: &PageView<'_>) -> Option<String> {
    meta_content(&page.document, "property", "article:published_time")
}

fn time_datetime(page: &PageView<'_>) -> Option<String> {
    let selector = Selector::parse("time[datetime]").ok()?;
    page.document
        .select(&selector)
        .find_map(|el| el.value().attr("datetime"))
        .map(|v| v.trim().to_string())
}

fn date_classed_element(page: &PageView<'_>) -> Option<String> {
    let selector = Selector::parse("span[class], div[class]").ok()?;
    page.document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("class")
                .map(|c| c.to_ascii_lowercase().contains("date"))
                .unwrap_or(false)
        })
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

fn updated_label(page: &PageView<'_>) -> Option<String> {
    UPDATED_LABEL_REGEX
        .captures(page.raw)
        .map(|caps| caps[1].trim().to_string())
}

fn meta_name_fallback(page: &PageView<'_>) -> Option<String> {
    ["last-modified", "lastmod", "modified", "updated", "modified_date", "date"]
        .iter()
        .find_map(|name| meta_content(&page.document, "name", name))
}

fn meta_property_fallback(page: &PageView<'_>) -> Option<String> {
    ["article:modified_time", "og:updated_time"]
        .iter()
        .find_map(|name| meta_content(&page.document, "property", name))
}

fn meta_http_equiv(page: &PageView<'_>) -> Option<String> {
    meta_content(&page.document, "http-equiv", "last-modified")
}

fn quoted_json_key(page: &PageView<'_>) -> Option<String> {
    QUOTED_KEY_REGEX
        .captures(page.raw)
        .map(|caps| caps[1].trim().to_string())
}

fn labeled_date_line(page: &PageView<'_>) -> Option<String> {
    LABELED_LINE_REGEX
        .captures(page.raw)
        .map(|caps| caps[1].trim().to_string())
}

fn relative_expression(page: &PageView<'_>) -> Option<String> {
    RELATIVE_REGEX
        .find(page.raw)
        .map(|m| m.as_str().to_string())
}

/// Most recent plausible date appearing anywhere in the markup
///
/// Scans several date spellings and keeps the maximum parsed instant.
pub fn most_recent_page_date(raw: &str, now: DateTime<Utc>) -> Option<Timestamp> {
    PAGE_DATE_REGEXES
        .iter()
        .flat_map(|regex| regex.find_iter(raw))
        .filter_map(|m| parse_timestamp_at(m.as_str(), now))
        .filter(|dt| is_reasonable_at(*dt, now))
        .max()
        .map(Timestamp::from_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run(strategy: fn(&PageView<'_>) -> Option<String>, html: &str) -> Option<String> {
        let page = PageView::parse(html);
        strategy(&page)
    }

    #[test]
    fn test_json_ld_top_level() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type": "Article", "dateModified": "2024-05-01T10:00:00Z"}
        </script></head></html>"#;
        assert_eq!(run(json_ld_date_modified, html).as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_json_ld_graph() {
        let html = r#"<script type="application/ld+json">
            {"@graph": [{"@type": "WebSite"}, {"@type": "WebPage", "dateModified": "2023-08-09"}]}
        </script>"#;
        assert_eq!(run(json_ld_date_modified, html).as_deref(), Some("2023-08-09"));
    }

    #[test]
    fn test_json_ld_array_and_malformed_block() {
        let html = r#"<script type="application/ld+json">{ not json</script>
            <script type="application/ld+json">[{"dateModified": "2022-02-02"}]</script>"#;
        assert_eq!(run(json_ld_date_modified, html).as_deref(), Some("2022-02-02"));
    }

    #[test]
    fn test_microdata() {
        let html = r#"<div itemscope><meta itemprop="dateModified" content="2021-07-07"></div>"#;
        assert_eq!(run(microdata_date_modified, html).as_deref(), Some("2021-07-07"));
    }

    #[test]
    fn test_og_meta() {
        let html = r#"<head><meta property="og:updated_time" content="2024-01-01T00:00:00Z"></head>"#;
        assert_eq!(run(og_updated_time, html).as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(run(article_modified_time, html), None);
    }

    #[test]
    fn test_time_element() {
        let html = r#"<p>Posted <time datetime="2024-03-03T08:00:00Z">March 3</time></p>"#;
        assert_eq!(run(time_datetime, html).as_deref(), Some("2024-03-03T08:00:00Z"));
    }

    #[test]
    fn test_date_classed_span() {
        let html = r#"<span class="post-date"> March 5, 2024 </span>"#;
        assert_eq!(run(date_classed_element, html).as_deref(), Some("March 5, 2024"));
    }

    #[test]
    fn test_updated_label() {
        let html = "<p>Last updated: 2024-06-01</p>";
        assert_eq!(run(updated_label, html).as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_meta_name_is_case_insensitive() {
        let html = r#"<meta name="Last-Modified" content="2020-10-10">"#;
        assert_eq!(run(meta_name_fallback, html).as_deref(), Some("2020-10-10"));
    }

    #[test]
    fn test_http_equiv() {
        let html = r#"<meta http-equiv="last-modified" content="Tue, 01 Sep 2020 10:00:00 GMT">"#;
        assert_eq!(
            run(meta_http_equiv, html).as_deref(),
            Some("Tue, 01 Sep 2020 10:00:00 GMT")
        );
    }

    #[test]
    fn test_quoted_json_key_in_inline_script() {
        let html = r#"<script>window.__DATA__ = {"lastModified": "2024-02-02T02:02:02Z"};</script>"#;
        assert_eq!(run(quoted_json_key, html).as_deref(), Some("2024-02-02T02:02:02Z"));
    }

    #[test]
    fn test_relative_expression() {
        let html = "<small>edited 4 hours ago</small>";
        assert_eq!(run(relative_expression, html).as_deref(), Some("4 hours ago"));
    }

    #[test]
    fn test_most_recent_page_date_picks_max() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let html = "<p>Founded 01/02/2003. News 2024-06-30. Event Dec 5, 2024. Future 2031-01-01</p>";
        let ts = most_recent_page_date(html, now).unwrap();
        assert_eq!(ts.to_string(), "2024-12-05 00:00:00 UTC");
    }

    #[test]
    fn test_most_recent_page_date_none() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(most_recent_page_date("<p>no dates here</p>", now).is_none());
    }
}
