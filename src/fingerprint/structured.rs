//! Structured extraction
//!
//! Builds a [`StructuredContent`] from a page: tag-stripped canonical text,
//! schema dates, stable elements and listing signals. Its hash changes only
//! when the semantically meaningful parts of a page do.

use crate::snapshot::{ArticleLink, ListingContent, StableElements, StructuredContent};
use crate::timestamp::{meta_content, parse_json_ld};
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Class or id fragments marking widgets whose text churns independently of the page
const VOLATILE_MARKERS: &[&str] = &[
    "cookie",
    "consent",
    "ticker",
    "timestamp",
    "social",
    "analytics",
    "advert",
];

const JSON_LD_KEYS: &[&str] = &[
    "dateModified",
    "datePublished",
    "lastModified",
    "updated",
    "modified",
];

const MICRODATA_PROPS: &[&str] = &["dateModified", "datePublished", "updated"];

static PAGE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)page[^>]*>\s*(\d+)\s*</").expect("hardcoded regex pattern is valid")
});

static LISTING_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"<div[^>]*class=["'][^"']*list[^"']*["'][^>]*>"#,
        r#"<div[^>]*class=["'][^"']*grid[^"']*["'][^>]*>"#,
        r#"<div[^>]*class=["'][^"']*catalog[^"']*["'][^>]*>"#,
        r#"<div[^>]*class=["'][^"']*archive[^"']*["'][^>]*>"#,
        r#"<div[^>]*class=["'][^"']*index[^"']*["'][^>]*>"#,
        r#"<ul[^>]*class=["'][^"']*posts[^"']*["'][^>]*>"#,
        r#"<div[^>]*class=["'][^"']*articles[^"']*["'][^>]*>"#,
    ]
    .iter()
    .map(|pattern| {
        Regex::new(&format!("(?i){}", pattern)).expect("hardcoded regex pattern is valid")
    })
    .collect()
});

/// Extracts the structured view of a page
pub fn extract_structured(markup: &str) -> StructuredContent {
    let document = Html::parse_document(markup);

    StructuredContent {
        canonical_content: canonical_text(&document),
        structured_data: structured_data(&document),
        stable_elements: stable_elements(&document),
        listing_content: listing_content(&document, markup),
    }
}

/// Hex SHA-256 of the sorted-key JSON form of a structured extraction
pub fn structured_hash(content: &StructuredContent) -> String {
    // Map keys come out sorted because serde_json's Map is ordered by key
    let json = serde_json::to_value(content)
        .map(|value| value.to_string())
        .unwrap_or_default();
    super::clean::sha256_hex(json.as_bytes())
}

fn is_volatile(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    let class_hit = value.classes().any(|class| {
        let class = class.to_ascii_lowercase();
        class == "ad"
            || class == "ads"
            || class.starts_with("ad-")
            || class.ends_with("-ad")
            || VOLATILE_MARKERS.iter().any(|marker| class.contains(marker))
    });
    let id_hit = value
        .id()
        .map(|id| {
            let id = id.to_ascii_lowercase();
            id == "ad" || VOLATILE_MARKERS.iter().any(|marker| id.contains(marker))
        })
        .unwrap_or(false);
    class_hit || id_hit
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if SKIPPED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !is_volatile(&child_element) {
                        collect_text(child_element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Visible text with scripts and volatile widgets removed, whitespace collapsed
fn canonical_text(document: &Html) -> String {
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn structured_data(document: &Html) -> BTreeMap<String, serde_json::Value> {
    let mut data = BTreeMap::new();

    if let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) {
        for element in document.select(&selector) {
            let body = element.text().collect::<String>();
            let Some(parsed) = parse_json_ld(&body) else {
                continue;
            };
            let items: Vec<&serde_json::Value> = match &parsed {
                serde_json::Value::Array(items) => items.iter().collect(),
                serde_json::Value::Object(map) => {
                    let mut items = vec![&parsed];
                    if let Some(serde_json::Value::Array(graph)) = map.get("@graph") {
                        items.extend(graph.iter());
                    }
                    items
                }
                _ => Vec::new(),
            };
            for item in items {
                let Some(object) = item.as_object() else {
                    continue;
                };
                for key in JSON_LD_KEYS {
                    if let Some(value) = object.get(*key) {
                        data.insert(format!("json_ld_{}", key), value.clone());
                    }
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("[itemprop][content]") {
        for prop in MICRODATA_PROPS {
            let found = document.select(&selector).find_map(|el| {
                let itemprop = el.value().attr("itemprop")?;
                if itemprop.eq_ignore_ascii_case(prop) {
                    el.value().attr("content")
                } else {
                    None
                }
            });
            if let Some(content) = found {
                data.insert(
                    format!("schema_{}", prop),
                    serde_json::Value::String(content.trim().to_string()),
                );
            }
        }
    }

    data
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn canonical_link(document: &Html) -> Option<String> {
    let selector = Selector::parse("link[href]").ok()?;
    document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("rel")
                .map(|rel| {
                    rel.split_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("canonical"))
                })
                .unwrap_or(false)
        })
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn stable_elements(document: &Html) -> StableElements {
    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
    });

    let headings = Selector::parse("h1, h2, h3, h4, h5, h6")
        .map(|selector| {
            document
                .select(&selector)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    StableElements {
        title,
        headings,
        canonical_url: canonical_link(document),
        og_url: meta_content(document, "property", "og:url"),
    }
}

fn listing_content(document: &Html, markup: &str) -> ListingContent {
    let article_links = Selector::parse("a[href]")
        .map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| {
                    let href = el.value().attr("href")?;
                    if !href.to_ascii_lowercase().contains("article") {
                        return None;
                    }
                    Some(ArticleLink {
                        href: href.to_string(),
                        text: element_text(el),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let item_ids = Selector::parse("[data-id]")
        .map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("data-id"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let page_number = PAGE_NUMBER_REGEX
        .captures(markup)
        .map(|caps| caps[1].to_string());

    ListingContent {
        article_links,
        item_ids,
        page_number,
    }
}

/// True if the markup carries hub/index page containers
pub fn is_listing_page(markup: &str) -> bool {
    LISTING_REGEXES.iter().any(|regex| regex.is_match(markup))
}

/// Canonical URL of a page: `<link rel="canonical">`, then `og:url`, then `current_url`
///
/// Relative hrefs are resolved against `current_url` when it parses.
pub fn canonical_url(markup: &str, current_url: &str) -> String {
    let document = Html::parse_document(markup);
    let declared = canonical_link(&document).or_else(|| meta_content(&document, "property", "og:url"));

    match declared {
        Some(href) => match url::Url::parse(current_url) {
            Ok(base) => crate::url::resolve_against(&base, &href)
                .map(|resolved| resolved.to_string())
                .unwrap_or(href),
            Err(_) => href,
        },
        None => current_url.to_string(),
    }
}
