//! XML sitemap discovery
//!
//! Sitemaps are looked up at the usual paths and through `Sitemap:`
//! directives in robots.txt. One level of `<sitemapindex>` is followed.

use crate::fetch::{Conditional, PageFetcher};
use crate::snapshot::Timestamp;
use crate::timestamp::normalize_timestamp;
use crate::url::{loosely_equal, resolve_against};
use regex::Regex;
use robotstxt::{parse_robotstxt, RobotsParseHandler};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// Paths probed for sitemaps on every host
pub const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemaps.xml"];

static INDEX_ROOT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<sitemapindex[\s>]").expect("hardcoded regex pattern is valid"));

static SITEMAP_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<sitemap(?:\s[^>]*)?>(.*?)</sitemap>").expect("hardcoded regex pattern is valid")
});

static URL_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<url(?:\s[^>]*)?>(.*?)</url>").expect("hardcoded regex pattern is valid")
});

static LOC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc>(.*?)</loc>").expect("hardcoded regex pattern is valid"));

static LASTMOD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<lastmod>(.*?)</lastmod>").expect("hardcoded regex pattern is valid")
});

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: locations of child sitemaps
    Index(Vec<String>),
    /// `<urlset>`: page locations with optional `lastmod`
    UrlSet(Vec<(String, Option<String>)>),
}

fn element_text(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn capture_text(regex: &Regex, block: &str) -> Option<String> {
    regex
        .captures(block)
        .map(|caps| element_text(&caps[1]))
        .filter(|text| !text.is_empty())
}

/// Parses sitemap XML into either an index or a URL set
pub fn parse_sitemap(xml: &str) -> SitemapDocument {
    if INDEX_ROOT_REGEX.is_match(xml) {
        let children = SITEMAP_BLOCK_REGEX
            .captures_iter(xml)
            .filter_map(|caps| capture_text(&LOC_REGEX, &caps[1]))
            .collect();
        return SitemapDocument::Index(children);
    }

    let entries = URL_BLOCK_REGEX
        .captures_iter(xml)
        .filter_map(|caps| {
            let block = &caps[1];
            let loc = capture_text(&LOC_REGEX, block)?;
            Some((loc, capture_text(&LASTMOD_REGEX, block)))
        })
        .collect();
    SitemapDocument::UrlSet(entries)
}

/// Collects `Sitemap:` directives while the robots.txt parser walks the file
#[derive(Default)]
struct SitemapDirectives {
    sitemaps: Vec<String>,
}

impl RobotsParseHandler for SitemapDirectives {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, _user_agent: &str) {}

    fn handle_allow(&mut self, _line_num: u32, _value: &str) {}

    fn handle_disallow(&mut self, _line_num: u32, _value: &str) {}

    fn handle_sitemap(&mut self, _line_num: u32, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.sitemaps.push(value.to_string());
        }
    }

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {}
}

/// Sitemap URLs declared in a robots.txt body
pub fn sitemap_directives(robots_txt: &str) -> Vec<String> {
    let mut handler = SitemapDirectives::default();
    parse_robotstxt(robots_txt, &mut handler);
    handler.sitemaps
}

/// URL to raw `lastmod` map gathered from a host's sitemaps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapData {
    entries: BTreeMap<String, String>,
}

impl SitemapData {
    pub fn insert(&mut self, loc: impl Into<String>, lastmod: impl Into<String>) {
        self.entries.insert(loc.into(), lastmod.into());
    }

    /// Records every entry of a URL set that carries a `lastmod`
    pub fn extend_from(&mut self, entries: Vec<(String, Option<String>)>) {
        for (loc, lastmod) in entries {
            if let Some(lastmod) = lastmod {
                self.insert(loc, lastmod);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(loc, lastmod)` pairs in URL order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(loc, lastmod)| (loc.as_str(), lastmod.as_str()))
    }

    /// Raw `lastmod` for a URL, tolerating trailing-slash and `www.` differences
    pub fn lastmod(&self, url: &str) -> Option<&str> {
        if let Some(lastmod) = self.entries.get(url) {
            return Some(lastmod.as_str());
        }
        self.entries
            .iter()
            .find(|(loc, _)| loosely_equal(url, loc))
            .map(|(_, lastmod)| lastmod.as_str())
    }

    /// Normalized `lastmod` for a URL
    pub fn lastmod_timestamp(&self, url: &str) -> Option<Timestamp> {
        self.lastmod(url).and_then(normalize_timestamp)
    }
}

async fn fetch_body(fetcher: &dyn PageFetcher, url: &Url, timeout: Duration) -> Option<String> {
    match fetcher.get(url, &Conditional::none(), timeout).await {
        Ok(response) if response.is_success() => Some(response.text()),
        Ok(response) => {
            tracing::debug!("Sitemap probe {} returned {}", url, response.status);
            None
        }
        Err(e) => {
            tracing::debug!("Sitemap probe {} failed: {}", url, e);
            None
        }
    }
}

/// Gathers `lastmod` data for a host
///
/// Every failure is skipped; the result may simply be empty.
pub async fn fetch_sitemap_data(
    fetcher: &dyn PageFetcher,
    base: &Url,
    timeout: Duration,
) -> SitemapData {
    let mut roots: Vec<Url> = SITEMAP_PATHS
        .iter()
        .filter_map(|path| resolve_against(base, path))
        .collect();

    if let Some(robots_url) = resolve_against(base, "/robots.txt") {
        if let Some(body) = fetch_body(fetcher, &robots_url, timeout).await {
            for declared in sitemap_directives(&body) {
                match resolve_against(base, &declared) {
                    Some(url) if !roots.contains(&url) => roots.push(url),
                    Some(_) => {}
                    None => tracing::debug!("Ignoring unusable sitemap directive {:?}", declared),
                }
            }
        }
    }

    let mut data = SitemapData::default();
    for root in &roots {
        let Some(body) = fetch_body(fetcher, root, timeout).await else {
            continue;
        };
        match parse_sitemap(&body) {
            SitemapDocument::UrlSet(entries) => data.extend_from(entries),
            SitemapDocument::Index(children) => {
                for child in children {
                    let Some(child_url) = resolve_against(root, &child) else {
                        continue;
                    };
                    let Some(child_body) = fetch_body(fetcher, &child_url, timeout).await else {
                        continue;
                    };
                    // Nested indexes are not followed
                    if let SitemapDocument::UrlSet(entries) = parse_sitemap(&child_body) {
                        data.extend_from(entries);
                    }
                }
            }
        }
    }

    tracing::debug!("Collected {} sitemap entries for {}", data.len(), base);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/a/</loc><lastmod>2024-06-01</lastmod></url>
  <url><loc>https://www.example.com/b</loc><lastmod>2024-06-02T10:00:00+00:00</lastmod></url>
  <url><loc>https://example.com/c?x=1&amp;y=2</loc><lastmod>2024-06-03</lastmod></url>
  <url><loc>https://example.com/no-date</loc></url>
</urlset>"#;

    const INDEX: &str = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/sitemap-posts.xml</loc><lastmod>2024-06-01</lastmod></sitemap>
  <sitemap><loc><![CDATA[https://example.com/sitemap-pages.xml]]></loc></sitemap>
</sitemapindex>"#;

    fn data() -> SitemapData {
        let mut data = SitemapData::default();
        match parse_sitemap(URLSET) {
            SitemapDocument::UrlSet(entries) => data.extend_from(entries),
            other => panic!("expected url set, got {:?}", other),
        }
        data
    }

    #[test]
    fn test_parse_urlset() {
        match parse_sitemap(URLSET) {
            SitemapDocument::UrlSet(entries) => {
                assert_eq!(entries.len(), 4);
                assert_eq!(entries[2].0, "https://example.com/c?x=1&y=2");
                assert_eq!(entries[3].1, None);
            }
            other => panic!("expected url set, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(
            parse_sitemap(INDEX),
            SitemapDocument::Index(vec![
                "https://example.com/sitemap-posts.xml".to_string(),
                "https://example.com/sitemap-pages.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_entries_without_lastmod_skipped() {
        let data = data();
        assert_eq!(data.len(), 3);
        assert_eq!(data.lastmod("https://example.com/no-date"), None);
    }

    #[test]
    fn test_trailing_slash_lookup() {
        assert_eq!(data().lastmod("https://example.com/a"), Some("2024-06-01"));
    }

    #[test]
    fn test_www_lookup() {
        let ts = data().lastmod_timestamp("https://example.com/b").unwrap();
        assert_eq!(ts.to_string(), "2024-06-02 10:00:00 UTC");
    }

    #[test]
    fn test_sitemap_directives() {
        let robots = "User-agent: *\nDisallow: /private\nSitemap: https://example.com/custom-map.xml\nsitemap: https://example.com/news.xml\n";
        assert_eq!(
            sitemap_directives(robots),
            vec![
                "https://example.com/custom-map.xml".to_string(),
                "https://example.com/news.xml".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_directives() {
        assert!(sitemap_directives("User-agent: *\nDisallow:\n").is_empty());
    }
}
