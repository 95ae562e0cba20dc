//! Structured extraction result stored alongside a snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantically stable view of a page used for the structured hash
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    /// Tag-stripped main text with volatile widgets removed
    #[serde(default)]
    pub canonical_content: String,

    /// Dates pulled from JSON-LD and microdata, keyed by origin and field
    #[serde(default)]
    pub structured_data: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub stable_elements: StableElements,

    #[serde(default)]
    pub listing_content: ListingContent,
}

/// Elements that rarely change between visits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StableElements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Text of every h1-h6 in document order
    #[serde(default)]
    pub headings: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_url: Option<String>,
}

/// Signals describing hub/index pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingContent {
    #[serde(default)]
    pub article_links: Vec<ArticleLink>,

    /// Values of `data-id` attributes
    #[serde(default)]
    pub item_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<String>,
}

/// A link that looks like it points at an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub href: String,
    pub text: String,
}
