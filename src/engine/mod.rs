//! Staleness decision engine
//!
//! The engine ties the leaf components together. A check runs in two phases:
//!
//! 1. [`FreshnessEngine::check_lightweight`] uses headers, a conditional GET,
//!    same-host feeds and crawl age to decide cheaply whether anything could
//!    have changed.
//! 2. When it could, [`FreshnessEngine::analyze_page`] (or
//!    [`FreshnessEngine::analyze_non_html`] for non-HTML resources) fetches the
//!    full content and builds a new [`Snapshot`].
//!
//! [`FreshnessEngine::evaluate`] runs both phases and classifies the result
//! against the prior snapshot. The engine never persists snapshots; that is
//! the caller's job.

mod conditional;
mod deep;
mod lightweight;

pub use conditional::ConditionalOutcome;
pub use lightweight::{CheckReason, LightweightCheckResult};

use crate::classify::{should_recrawl, Identifier, RecrawlDecision};
use crate::config::{Config, RecrawlPolicy};
use crate::feeds::{fetch_sitemap_data, FeedCache, FeedProbe, SitemapData};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::history::HistoryStore;
use crate::snapshot::Snapshot;
use crate::timestamp::TimestampResolver;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Which path produced an [`Analysis`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    /// Phase 1 found nothing new; the prior snapshot was reused
    Lightweight,
    /// Full HTML analysis
    Deep,
    /// Raw-byte analysis of a non-HTML resource
    Raw,
}

/// Result of one evaluation pass over a URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub snapshot: Snapshot,

    /// `key:value|...` identifier built from the snapshot
    pub identifier: String,

    /// Length of the cleaned markup (0 when nothing was fetched)
    pub cleaned_content_length: usize,

    pub content_type: Option<String>,

    /// `<link rel="canonical">` or `og:url`, else the fetched URL (HTML only)
    pub canonical_url: Option<String>,

    /// Whether the page looks like an index/listing page (HTML only)
    pub is_listing: bool,

    pub phase: AnalysisPhase,

    /// Phase 1 result, when Phase 1 ran
    pub lightweight_check: Option<LightweightCheckResult>,

    /// Fetch failure description
    pub error: Option<String>,
}

impl Analysis {
    fn new(snapshot: Snapshot, phase: AnalysisPhase) -> Self {
        let identifier = Identifier::from_snapshot(&snapshot).to_string();
        Self {
            snapshot,
            identifier,
            cleaned_content_length: 0,
            content_type: None,
            canonical_url: None,
            is_listing: false,
            phase,
            lightweight_check: None,
            error: None,
        }
    }

    /// Builds a failed analysis carrying only the URL, status and error
    fn failed(url: &Url, phase: AnalysisPhase, status: Option<u16>, error: String) -> Self {
        let mut snapshot = Snapshot::new(url.as_str());
        snapshot.response_status = status;
        let mut analysis = Self::new(snapshot, phase);
        analysis.error = Some(error);
        analysis
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// An analysis together with the recrawl verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub analysis: Analysis,
    pub decision: RecrawlDecision,
}

impl Evaluation {
    pub fn snapshot(&self) -> &Snapshot {
        &self.analysis.snapshot
    }

    pub fn needs_recrawl(&self) -> bool {
        self.decision.recrawl
    }
}

/// Network timeouts and probe sizes used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub head_timeout: Duration,
    pub get_timeout: Duration,
    pub feed_timeout: Duration,
    /// How much of the page body is scanned for feed links in Phase 1
    pub probe_bytes: usize,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            head_timeout: config.timeouts.head(),
            get_timeout: config.timeouts.get(),
            feed_timeout: config.timeouts.feed(),
            probe_bytes: config.feeds.probe_bytes,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            head_timeout: Duration::from_secs(5),
            get_timeout: Duration::from_secs(15),
            feed_timeout: Duration::from_secs(15),
            probe_bytes: 10 * 1024,
        }
    }
}

/// Two-phase freshness checker over a [`PageFetcher`]
pub struct FreshnessEngine<F: PageFetcher> {
    fetcher: F,
    history: Arc<HistoryStore>,
    policy: RecrawlPolicy,
    feed_cache: FeedCache,
    resolver: TimestampResolver,
    settings: EngineSettings,
}

impl<F: PageFetcher> FreshnessEngine<F> {
    /// Creates an engine with default timeouts, policy and feed cache
    pub fn new(fetcher: F, history: Arc<HistoryStore>) -> Self {
        Self {
            fetcher,
            history,
            policy: RecrawlPolicy::default(),
            feed_cache: FeedCache::default(),
            resolver: TimestampResolver::new(),
            settings: EngineSettings::default(),
        }
    }

    /// Creates an engine whose timeouts, policy and feed TTL come from `config`
    pub fn from_config(fetcher: F, history: Arc<HistoryStore>, config: &Config) -> Self {
        Self {
            fetcher,
            history,
            policy: RecrawlPolicy::from_config(&config.recrawl),
            feed_cache: FeedCache::with_ttl_minutes(config.feeds.cache_ttl_minutes),
            resolver: TimestampResolver::new(),
            settings: EngineSettings::from_config(config),
        }
    }

    pub fn with_policy(mut self, policy: RecrawlPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_feed_cache(mut self, feed_cache: FeedCache) -> Self {
        self.feed_cache = feed_cache;
        self
    }

    pub fn with_resolver(mut self, resolver: TimestampResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn policy(&self) -> &RecrawlPolicy {
        &self.policy
    }

    pub fn feed_cache(&self) -> &FeedCache {
        &self.feed_cache
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn feed_probe(&self) -> FeedProbe<'_> {
        FeedProbe::new(&self.fetcher, self.settings.feed_timeout).with_cache(&self.feed_cache)
    }

    /// Runs both phases for a URL and classifies the outcome against `prior`
    ///
    /// Never fails: network problems fall through to the next check or, at
    /// worst, produce an analysis with `error` set and a `fetch_failed`
    /// recrawl verdict. Such an analysis carries no hashes and should not
    /// replace a stored snapshot.
    pub async fn evaluate(&self, url: &Url, prior: Option<&Snapshot>) -> Evaluation {
        let check = self.check_lightweight(url, prior).await;

        if !check.needs_deep_check {
            if let Some(prior) = prior {
                tracing::info!("{}: unchanged ({})", url, check.reason.as_str());
                let mut snapshot = prior.clone();
                snapshot.is_not_modified = true;
                let mut analysis = Analysis::new(snapshot, AnalysisPhase::Lightweight);
                analysis.lightweight_check = Some(check);
                return Evaluation {
                    analysis,
                    decision: RecrawlDecision::unchanged(),
                };
            }
        }

        // Phase 1 only skips its HEAD when there is no prior snapshot
        let content_type = match check.reason {
            CheckReason::NoPreviousData => self.probe_content_type(url).await,
            _ => check.content_type.clone(),
        };

        let mut analysis = match content_type.as_deref() {
            Some(ct) if !is_html(ct) => self.analyze_non_html(url, ct).await,
            _ => self.analyze_page(url).await,
        };
        analysis.lightweight_check = Some(check);

        let decision = if analysis.is_error() {
            RecrawlDecision::fetch_failed()
        } else {
            match prior {
                Some(prior) => should_recrawl(prior, &analysis.snapshot, &self.history),
                None => RecrawlDecision::baseline(),
            }
        };

        tracing::info!(
            "{}: {} ({}, {:?} phase)",
            url,
            if decision.recrawl { "recrawl" } else { "skip" },
            decision.rule.as_str(),
            analysis.phase
        );

        Evaluation { analysis, decision }
    }

    /// Content type reported by a HEAD request, if any
    async fn probe_content_type(&self, url: &Url) -> Option<String> {
        match self.fetcher.head(url, self.settings.head_timeout).await {
            Ok(response) if response.status < 400 => response.content_type,
            Ok(response) => {
                tracing::debug!("HEAD {} returned {}", url, response.status);
                None
            }
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
                None
            }
        }
    }

    /// Collects sitemap `lastmod` values for a site
    pub async fn sitemap_data(&self, base: &Url) -> SitemapData {
        fetch_sitemap_data(&self.fetcher, base, self.settings.feed_timeout).await
    }
}

impl FreshnessEngine<HttpFetcher> {
    /// Production engine over `reqwest`, configured from `config`
    pub fn http(config: &Config, history: Arc<HistoryStore>) -> crate::Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Ok(Self::from_config(fetcher, history, config))
    }
}

/// True for `text/html` content types, ignoring parameters
pub fn is_html(content_type: &str) -> bool {
    crate::fetch::media_type(content_type) == "text/html"
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::fetch::{Conditional, FetchError, FetchResult, FetchedResponse, PageFetcher};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    /// In-memory fetcher serving canned responses by URL
    #[derive(Default)]
    pub struct StubFetcher {
        pub heads: HashMap<String, FetchedResponse>,
        pub gets: HashMap<String, FetchedResponse>,
        /// Response for GETs that carry validators
        pub conditional_gets: HashMap<String, FetchedResponse>,
        pub requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn html(body: &str) -> FetchedResponse {
            FetchedResponse {
                status: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: body.as_bytes().to_vec(),
                ..FetchedResponse::default()
            }
        }

        pub fn request_log(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn head(&self, url: &Url, _timeout: Duration) -> FetchResult<FetchedResponse> {
            self.requests.lock().unwrap().push(format!("HEAD {}", url));
            self.heads
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Connect(url.to_string()))
        }

        async fn get(
            &self,
            url: &Url,
            conditional: &Conditional,
            _timeout: Duration,
        ) -> FetchResult<FetchedResponse> {
            self.requests.lock().unwrap().push(format!("GET {}", url));
            if !conditional.is_empty() {
                if let Some(response) = self.conditional_gets.get(url.as_str()) {
                    return Ok(response.clone());
                }
            }
            self.gets
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Connect(url.to_string()))
        }
    }
}
