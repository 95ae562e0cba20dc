//! Snapshot model
//!
//! A [`Snapshot`] is the last-known fingerprint, timestamp and header state of
//! a URL. The engine produces a new one on every deep analysis; the caller
//! persists it (see [`crate::storage`]) and hands it back on the next check.

mod content;
mod time;

pub use content::{ArticleLink, ListingContent, StableElements, StructuredContent};
pub use time::{Timestamp, TIMESTAMP_FORMAT};

use serde::{Deserialize, Serialize};

/// Where a snapshot's `last_updated` value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// JSON-LD or microdata `dateModified`
    Schema,
    /// Open Graph / article meta properties
    Og,
    /// Same-host RSS or Atom feed
    RssOrAtom,
    /// `<time>` elements, date-classed elements, "Updated:" text
    Visible,
    /// Generic `<meta>` fallbacks
    MetaTag,
    /// Free-text heuristics and relative expressions
    ContentExtraction,
    /// HTTP `Last-Modified` response header
    HttpHeader,
    /// Most recent date found anywhere on the page
    PageDateExtraction,
    /// Nothing validated
    #[default]
    None,
}

impl TimestampSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Og => "og",
            Self::RssOrAtom => "rss_or_atom",
            Self::Visible => "visible",
            Self::MetaTag => "meta_tag",
            Self::ContentExtraction => "content_extraction",
            Self::HttpHeader => "http_header",
            Self::PageDateExtraction => "page_date_extraction",
            Self::None => "none",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "schema" => Some(Self::Schema),
            "og" => Some(Self::Og),
            "rss_or_atom" => Some(Self::RssOrAtom),
            "visible" => Some(Self::Visible),
            "meta_tag" => Some(Self::MetaTag),
            "content_extraction" => Some(Self::ContentExtraction),
            "http_header" => Some(Self::HttpHeader),
            "page_date_extraction" => Some(Self::PageDateExtraction),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Last-known state of a URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub url: String,

    /// SHA-256 of the cleaned markup (or raw bytes for non-HTML resources)
    pub content_hash: Option<String>,

    /// SHA-256 of the top token frequencies
    pub fuzzy_hash: Option<String>,

    /// SHA-256 of the structured extraction; absent for non-HTML resources
    pub structured_hash: Option<String>,

    /// Best-effort "last meaningfully updated" instant
    pub last_updated: Option<Timestamp>,

    #[serde(default)]
    pub timestamp_source: TimestampSource,

    /// Raw `Last-Modified` response header
    pub last_modified_header: Option<String>,

    /// Raw `ETag` response header
    pub etag_header: Option<String>,

    /// When this snapshot was taken
    pub crawl_timestamp: Option<Timestamp>,

    #[serde(default)]
    pub structured_content: StructuredContent,

    pub response_status: Option<u16>,

    #[serde(default)]
    pub is_not_modified: bool,
}

impl Snapshot {
    /// Creates an empty snapshot for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_hash: None,
            fuzzy_hash: None,
            structured_hash: None,
            last_updated: None,
            timestamp_source: TimestampSource::None,
            last_modified_header: None,
            etag_header: None,
            crawl_timestamp: None,
            structured_content: StructuredContent::default(),
            response_status: None,
            is_not_modified: false,
        }
    }

    /// True if the snapshot carries any timestamp-like validator
    pub fn has_reliable_timestamp(&self) -> bool {
        self.last_updated.is_some()
            || self.last_modified_header.is_some()
            || self.etag_header.is_some()
    }

    pub fn canonical_content(&self) -> &str {
        &self.structured_content.canonical_content
    }
}
