//! Feed probing for a page

use crate::feeds::cache::FeedCache;
use crate::feeds::discovery::discover_feed_urls;
use crate::feeds::parse::{latest_feed_time_at, looks_like_feed};
use crate::feeds::FeedSignal;
use crate::fetch::{Conditional, PageFetcher};
use crate::snapshot::Timestamp;
use crate::timestamp::FeedTimestampSource;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use url::Url;

/// Cache key for a page's host (host plus effective port)
fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Fetches a page's same-host feeds and reports the newest entry
pub struct FeedProbe<'a> {
    fetcher: &'a dyn PageFetcher,
    cache: Option<&'a FeedCache>,
    timeout: Duration,
}

impl<'a> FeedProbe<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, timeout: Duration) -> Self {
        Self {
            fetcher,
            cache: None,
            timeout,
        }
    }

    /// Serves and stores per-host signals through `cache`
    pub fn with_cache(mut self, cache: &'a FeedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cached signal for the page's host, if still fresh
    pub fn cached_signal(&self, page_url: &Url) -> Option<FeedSignal> {
        let cache = self.cache?;
        cache.get(&host_key(page_url)?)
    }

    /// Discovers and fetches feeds, keeping the newest valid timestamp
    ///
    /// Bodies that do not look like RSS or Atom are ignored, as are fetch
    /// failures. A cached signal for the host short-circuits everything.
    pub async fn probe(&self, page_url: &Url, markup: &str) -> FeedSignal {
        let key = host_key(page_url);

        if let (Some(cache), Some(key)) = (self.cache, key.as_deref()) {
            if let Some(signal) = cache.get(key) {
                tracing::debug!("Feed signal for {} served from cache", key);
                return signal;
            }
        }

        let feed_urls = discover_feed_urls(page_url, markup);
        let now = Utc::now();
        let mut latest: Option<Timestamp> = None;

        for feed_url in &feed_urls {
            match self.fetcher.get(feed_url, &Conditional::none(), self.timeout).await {
                Ok(response) if response.is_success() => {
                    let body = response.text();
                    if !looks_like_feed(&body) {
                        continue;
                    }
                    if let Some(ts) = latest_feed_time_at(&body, now) {
                        tracing::debug!("Feed {} latest entry {}", feed_url, ts);
                        latest = latest.max(Some(ts));
                    }
                }
                Ok(response) => {
                    tracing::debug!("Feed {} returned {}", feed_url, response.status);
                }
                Err(e) => {
                    tracing::debug!("Feed {} failed: {}", feed_url, e);
                }
            }
        }

        let signal = FeedSignal { feed_urls, latest };
        if let (Some(cache), Some(key)) = (self.cache, key.as_deref()) {
            cache.insert(key, signal.clone());
        }
        signal
    }
}

#[async_trait]
impl FeedTimestampSource for FeedProbe<'_> {
    async fn latest_feed_timestamp(&self, page_url: &Url, markup: &str) -> Option<Timestamp> {
        self.probe(page_url, markup).await.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_includes_port() {
        let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(host_key(&url).as_deref(), Some("127.0.0.1:8080"));
        let url = Url::parse("https://Example.com/").unwrap();
        assert_eq!(host_key(&url).as_deref(), Some("example.com:443"));
    }
}
