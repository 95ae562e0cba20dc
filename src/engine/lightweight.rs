//! Phase 1: cheap staleness checks

use crate::engine::{is_html, FreshnessEngine};
use crate::fetch::{Conditional, PageFetcher};
use crate::snapshot::{Snapshot, Timestamp};
use serde::{Deserialize, Serialize};
use url::Url;

/// Crawls older than this many whole days always get a deep check
const OLD_CRAWL_DAYS: i64 = 7;

/// Why Phase 1 reached its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckReason {
    NoPreviousData,
    NonHtmlContent,
    HeadersUnchanged,
    #[serde(rename = "304_not_modified")]
    NotModified,
    RssNewerThanCrawl,
    OldCrawl,
    WithinRecrawlFrequency,
    DefaultCheckNeeded,
}

impl CheckReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPreviousData => "no_previous_data",
            Self::NonHtmlContent => "non_html_content",
            Self::HeadersUnchanged => "headers_unchanged",
            Self::NotModified => "304_not_modified",
            Self::RssNewerThanCrawl => "rss_newer_than_crawl",
            Self::OldCrawl => "old_crawl",
            Self::WithinRecrawlFrequency => "within_recrawl_frequency",
            Self::DefaultCheckNeeded => "default_check_needed",
        }
    }
}

/// Verdict of the lightweight check plus whatever diagnostics it gathered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightweightCheckResult {
    pub needs_deep_check: bool,
    pub reason: CheckReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_crawl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_since_crawl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_timestamp: Option<Timestamp>,
}

impl LightweightCheckResult {
    fn new(needs_deep_check: bool, reason: CheckReason) -> Self {
        Self {
            needs_deep_check,
            reason,
            content_type: None,
            days_since_crawl: None,
            hours_since_crawl: None,
            rss_timestamp: None,
        }
    }

    fn deep(reason: CheckReason) -> Self {
        Self::new(true, reason)
    }

    fn skip(reason: CheckReason) -> Self {
        Self::new(false, reason)
    }
}

impl<F: PageFetcher> FreshnessEngine<F> {
    /// Decides cheaply whether `url` needs a deep check
    ///
    /// Every network step falls through to the next one on error or timeout.
    pub async fn check_lightweight(
        &self,
        url: &Url,
        prior: Option<&Snapshot>,
    ) -> LightweightCheckResult {
        self.check_lightweight_at(url, prior, Timestamp::now()).await
    }

    /// [`check_lightweight`](Self::check_lightweight) with an explicit clock
    ///
    /// Whenever the HEAD request reported a content type, it is carried on the
    /// result so the deep phase does not have to ask again.
    pub async fn check_lightweight_at(
        &self,
        url: &Url,
        prior: Option<&Snapshot>,
        now: Timestamp,
    ) -> LightweightCheckResult {
        let Some(prior) = prior else {
            return LightweightCheckResult::deep(CheckReason::NoPreviousData);
        };

        let mut content_type = None;
        match self.fetcher.head(url, self.settings.head_timeout).await {
            Ok(response) if response.status < 400 => {
                content_type = response.content_type;

                if let Some(ct) = content_type.as_deref().filter(|ct| !is_html(ct)) {
                    tracing::debug!("{} is {}, not HTML", url, ct);
                    let mut result = LightweightCheckResult::deep(CheckReason::NonHtmlContent);
                    result.content_type = Some(ct.to_string());
                    return result;
                }

                if let (Some(etag), Some(last_modified)) = (&response.etag, &response.last_modified) {
                    if prior.etag_header.as_ref() == Some(etag)
                        && prior.last_modified_header.as_ref() == Some(last_modified)
                    {
                        let mut result = LightweightCheckResult::skip(CheckReason::HeadersUnchanged);
                        result.content_type = content_type;
                        return result;
                    }
                }
            }
            Ok(response) => {
                tracing::debug!("HEAD {} returned {}", url, response.status);
            }
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
            }
        }

        let mut result = self.check_beyond_headers(url, prior, now).await;
        result.content_type = content_type;
        result
    }

    /// Steps after the HEAD request: conditional GET, feeds, crawl age
    async fn check_beyond_headers(
        &self,
        url: &Url,
        prior: &Snapshot,
        now: Timestamp,
    ) -> LightweightCheckResult {
        let conditional = Conditional::from_validators(
            prior.last_modified_header.as_deref(),
            prior.etag_header.as_deref(),
        );
        if !conditional.is_empty() {
            match self.fetcher.get(url, &conditional, self.settings.get_timeout).await {
                Ok(response) if response.is_not_modified() => {
                    return LightweightCheckResult::skip(CheckReason::NotModified);
                }
                Ok(response) => {
                    tracing::debug!("Conditional GET {} returned {}", url, response.status);
                }
                Err(e) => {
                    tracing::debug!("Conditional GET {} failed: {}", url, e);
                }
            }
        }

        if let Some(rss_timestamp) = self.feed_timestamp(url).await {
            if let Some(last_crawl) = prior.crawl_timestamp {
                if rss_timestamp > last_crawl {
                    let mut result = LightweightCheckResult::deep(CheckReason::RssNewerThanCrawl);
                    result.rss_timestamp = Some(rss_timestamp);
                    return result;
                }
            }
        }

        if let Some(last_crawl) = prior.crawl_timestamp {
            let elapsed = now.since(&last_crawl);

            let days = elapsed.num_days();
            if days > OLD_CRAWL_DAYS {
                let mut result = LightweightCheckResult::deep(CheckReason::OldCrawl);
                result.days_since_crawl = Some(days);
                return result;
            }

            let hours = elapsed.num_seconds() as f64 / 3600.0;
            let interval = self.policy.hours_for(url.host_str().unwrap_or_default());
            if hours < interval as f64 {
                let mut result = LightweightCheckResult::skip(CheckReason::WithinRecrawlFrequency);
                result.hours_since_crawl = Some(hours);
                return result;
            }
        }

        LightweightCheckResult::deep(CheckReason::DefaultCheckNeeded)
    }

    /// Newest same-host feed entry, from the cache or a fresh probe
    async fn feed_timestamp(&self, url: &Url) -> Option<Timestamp> {
        let probe = self.feed_probe();
        if let Some(signal) = probe.cached_signal(url) {
            return signal.latest;
        }

        let response = match self.fetcher.get(url, &Conditional::none(), self.settings.get_timeout).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::debug!("Feed probe GET {} returned {}", url, response.status);
                return None;
            }
            Err(e) => {
                tracing::debug!("Feed probe GET {} failed: {}", url, e);
                return None;
            }
        };

        let prefix = response.text_prefix(self.settings.probe_bytes);
        probe.probe(url, &prefix).await.latest
    }
}
