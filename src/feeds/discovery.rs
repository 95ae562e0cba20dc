//! Feed URL discovery

use crate::url::{resolve_against, same_host};
use scraper::{Html, Selector};
use url::Url;

/// Maximum number of feeds probed per page
pub const MAX_FEEDS: usize = 5;

/// Paths guessed on every host in addition to advertised feeds
pub const COMMON_FEED_PATHS: &[&str] = &["/feed", "/rss.xml", "/atom.xml", "/feed.xml", "/index.xml"];

/// Collects same-host feed candidates for a page
///
/// Advertised `<link rel="alternate">` feeds (type mentioning rss, atom or
/// xml) come first, then the common guesses. Candidates are deduplicated on
/// their trailing-slash-trimmed form and capped at [`MAX_FEEDS`].
pub fn discover_feed_urls(page_url: &Url, markup: &str) -> Vec<Url> {
    let mut candidates = advertised_feeds(page_url, markup);
    candidates.extend(
        COMMON_FEED_PATHS
            .iter()
            .filter_map(|path| resolve_against(page_url, path)),
    );

    let mut seen: Vec<String> = Vec::new();
    let mut feeds = Vec::new();
    for candidate in candidates {
        if !same_host(page_url, &candidate) {
            continue;
        }
        let key = candidate.as_str().trim_end_matches('/').to_string();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        feeds.push(candidate);
        if feeds.len() == MAX_FEEDS {
            break;
        }
    }
    feeds
}

fn advertised_feeds(page_url: &Url, markup: &str) -> Vec<Url> {
    let document = Html::parse_document(markup);
    let Ok(selector) = Selector::parse("link[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|el| {
            let rel_is_alternate = el
                .value()
                .attr("rel")
                .map(|rel| {
                    rel.split_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("alternate"))
                })
                .unwrap_or(false);
            let type_is_feed = el
                .value()
                .attr("type")
                .map(|t| {
                    let t = t.to_ascii_lowercase();
                    t.contains("rss") || t.contains("atom") || t.contains("xml")
                })
                .unwrap_or(false);
            rel_is_alternate && type_is_feed
        })
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_against(page_url, href))
        .collect()
}
