//! Feed and sitemap discovery
//!
//! Same-host RSS/Atom feeds and XML sitemaps act as authoritative freshness
//! signals: a feed entry newer than the last crawl is reason enough to look
//! at a page again.

mod cache;
mod discovery;
mod parse;
mod probe;
mod sitemap;

pub use cache::{CachedFeedSignal, FeedCache, DEFAULT_FEED_TTL_MINUTES};
pub use discovery::{discover_feed_urls, COMMON_FEED_PATHS, MAX_FEEDS};
pub use parse::{feed_time_candidates, latest_feed_time_at, looks_like_feed};
pub use probe::FeedProbe;
pub use sitemap::{
    fetch_sitemap_data, parse_sitemap, sitemap_directives, SitemapData, SitemapDocument,
    SITEMAP_PATHS,
};

use crate::snapshot::Timestamp;
use url::Url;

/// Feeds found for a page and the newest valid instant among them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSignal {
    pub feed_urls: Vec<Url>,
    pub latest: Option<Timestamp>,
}
