//! Phase 2: full content analysis

use crate::engine::{Analysis, AnalysisPhase, FreshnessEngine};
use crate::fetch::{media_type, Conditional, FetchedResponse, PageFetcher};
use crate::fingerprint::{canonical_url, fuzzy_hash, is_listing_page, sha256_hex, Fingerprint};
use crate::snapshot::{Snapshot, Timestamp, TimestampSource};
use crate::timestamp::{most_recent_page_date, normalize_timestamp, FeedTimestampSource};
use chrono::Utc;
use url::Url;

/// Non-HTML media types that still get a fuzzy hash over their text
fn is_textual(content_type: &str) -> bool {
    let media = media_type(content_type);
    media.starts_with("text/") || media == "application/json" || media == "application/xml"
}

impl<F: PageFetcher> FreshnessEngine<F> {
    /// Fetches and fingerprints an HTML page, recording it in the history store
    ///
    /// The `last_updated` value comes from the timestamp resolver (feeds
    /// included), then the `Last-Modified` header, then the most recent date
    /// found anywhere on the page. Error statuses are reported as failures
    /// and never fingerprinted.
    pub async fn analyze_page(&self, url: &Url) -> Analysis {
        let response = match self.fetcher.get(url, &Conditional::none(), self.settings.get_timeout).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::debug!("Deep GET {} returned {}", url, response.status);
                let error = format!("unexpected status {}", response.status);
                let mut analysis = Analysis::failed(url, AnalysisPhase::Deep, Some(response.status), error);
                analysis.content_type = response.content_type;
                return analysis;
            }
            Err(e) => {
                tracing::warn!("Deep analysis of {} failed: {}", url, e);
                return Analysis::failed(url, AnalysisPhase::Deep, None, e.to_string());
            }
        };

        let markup = response.text();
        let fingerprint = Fingerprint::of(&markup);

        let probe = self.feed_probe();
        let feeds: &dyn FeedTimestampSource = &probe;
        let resolution = self.resolver.resolve(&markup, url, Some(feeds)).await;

        // Validators come from a plain GET so a cached intermediary cannot
        // hand back stale headers.
        let headers = match self.fetcher.get(url, &Conditional::none(), self.settings.get_timeout).await {
            Ok(headers) => headers,
            Err(e) => {
                tracing::debug!("Header GET {} failed, reusing first response: {}", url, e);
                response.clone()
            }
        };

        let (last_updated, timestamp_source) = match resolution.timestamp {
            Some(ts) => (Some(ts), resolution.source),
            None => fallback_timestamp(&headers, &markup),
        };

        let mut snapshot = Snapshot::new(url.as_str());
        snapshot.content_hash = Some(fingerprint.content_hash);
        snapshot.fuzzy_hash = Some(fingerprint.fuzzy_hash);
        snapshot.structured_hash = Some(fingerprint.structured_hash);
        snapshot.structured_content = fingerprint.structured_content;
        snapshot.last_updated = last_updated;
        snapshot.timestamp_source = timestamp_source;
        snapshot.last_modified_header = headers.last_modified.clone();
        snapshot.etag_header = headers.etag.clone();
        snapshot.crawl_timestamp = Some(Timestamp::now());
        snapshot.response_status = Some(headers.status);
        snapshot.is_not_modified = headers.is_not_modified();

        self.history.record_snapshot(&snapshot);

        tracing::debug!(
            "Analyzed {}: status {}, last updated {} via {}",
            url,
            headers.status,
            snapshot
                .last_updated
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            snapshot.timestamp_source.as_str()
        );

        let mut analysis = Analysis::new(snapshot, AnalysisPhase::Deep);
        analysis.cleaned_content_length = fingerprint.cleaned_length;
        analysis.content_type = response.content_type;
        analysis.canonical_url = Some(canonical_url(&markup, url.as_str()));
        analysis.is_listing = is_listing_page(&markup);
        analysis
    }

    /// Fingerprints a non-HTML resource from its raw bytes
    ///
    /// There is no structured hash, and the only timestamp source is the
    /// `Last-Modified` header. Failures produce an analysis with `error` set
    /// and no hashes.
    pub async fn analyze_non_html(&self, url: &Url, content_type: &str) -> Analysis {
        let response = match self.fetcher.get(url, &Conditional::none(), self.settings.get_timeout).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::debug!("Raw GET {} returned {}", url, response.status);
                let error = format!("unexpected status {}", response.status);
                let mut analysis = Analysis::failed(url, AnalysisPhase::Raw, Some(response.status), error);
                analysis.content_type = Some(content_type.to_string());
                return analysis;
            }
            Err(e) => {
                tracing::warn!("Raw analysis of {} failed: {}", url, e);
                let mut analysis = Analysis::failed(url, AnalysisPhase::Raw, None, e.to_string());
                analysis.content_type = Some(content_type.to_string());
                return analysis;
            }
        };

        let mut snapshot = Snapshot::new(url.as_str());
        snapshot.content_hash = Some(sha256_hex(&response.body));
        if is_textual(content_type) {
            snapshot.fuzzy_hash = Some(fuzzy_hash(&response.text()));
        }
        if let Some(ts) = response.last_modified.as_deref().and_then(normalize_timestamp) {
            snapshot.last_updated = Some(ts);
            snapshot.timestamp_source = TimestampSource::HttpHeader;
        }
        snapshot.last_modified_header = response.last_modified.clone();
        snapshot.etag_header = response.etag.clone();
        snapshot.crawl_timestamp = Some(Timestamp::now());
        snapshot.response_status = Some(response.status);

        self.history.record_snapshot(&snapshot);

        let mut analysis = Analysis::new(snapshot, AnalysisPhase::Raw);
        analysis.cleaned_content_length = response.body.len();
        analysis.content_type = Some(content_type.to_string());
        analysis
    }
}

/// `Last-Modified` first, then the newest date anywhere in the markup
fn fallback_timestamp(headers: &FetchedResponse, markup: &str) -> (Option<Timestamp>, TimestampSource) {
    if let Some(ts) = headers.last_modified.as_deref().and_then(normalize_timestamp) {
        return (Some(ts), TimestampSource::HttpHeader);
    }
    match most_recent_page_date(markup, Utc::now()) {
        Some(ts) => (Some(ts), TimestampSource::PageDateExtraction),
        None => (None, TimestampSource::None),
    }
}
