//! Priority-ordered "last updated" resolution

use crate::snapshot::{Timestamp, TimestampSource};
use crate::timestamp::normalize::normalize_timestamp_at;
use crate::timestamp::strategies::{PageView, Strategy, PRIMARY_STRATEGIES, SECONDARY_STRATEGIES};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

/// Source of feed-derived freshness for a page
///
/// Implemented by the feed prober; tests substitute fixed values.
#[async_trait]
pub trait FeedTimestampSource: Send + Sync {
    /// Latest valid timestamp from same-host feeds advertised by (or guessed for) the page
    async fn latest_feed_timestamp(&self, page_url: &Url, markup: &str) -> Option<Timestamp>;
}

/// Outcome of a resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    pub timestamp: Option<Timestamp>,
    pub source: TimestampSource,
}

impl Resolution {
    pub fn found(timestamp: Timestamp, source: TimestampSource) -> Self {
        Self {
            timestamp: Some(timestamp),
            source,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Resolves the best "last meaningfully updated" instant for a page
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampResolver {
    fixed_now: Option<DateTime<Utc>>,
}

impl TimestampResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with a pinned clock, used to make relative expressions deterministic
    pub fn with_now(now: DateTime<Utc>) -> Self {
        Self {
            fixed_now: Some(now),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    /// Runs the full chain; the feed step is only consulted when `feeds` is supplied
    pub async fn resolve(
        &self,
        markup: &str,
        page_url: &Url,
        feeds: Option<&dyn FeedTimestampSource>,
    ) -> Resolution {
        let now = self.now();

        let primary = run_strategies(markup, PRIMARY_STRATEGIES, now);
        if primary.is_found() {
            return primary;
        }

        if let Some(feeds) = feeds {
            if let Some(ts) = feeds.latest_feed_timestamp(page_url, markup).await {
                tracing::debug!("Resolved {} from feed: {}", page_url, ts);
                return Resolution::found(ts, TimestampSource::RssOrAtom);
            }
        }

        run_strategies(markup, SECONDARY_STRATEGIES, now)
    }

    /// Runs the chain without the feed step
    pub fn resolve_offline(&self, markup: &str) -> Resolution {
        let now = self.now();
        let primary = run_strategies(markup, PRIMARY_STRATEGIES, now);
        if primary.is_found() {
            return primary;
        }
        run_strategies(markup, SECONDARY_STRATEGIES, now)
    }
}

/// First strategy whose candidate normalizes into the reasonable window
///
/// The DOM is parsed and dropped inside this call so no parse tree is held
/// across an await point.
fn run_strategies(markup: &str, strategies: &[Strategy], now: DateTime<Utc>) -> Resolution {
    let page = PageView::parse(markup);

    for strategy in strategies {
        let Some(raw) = (strategy.extract)(&page) else {
            continue;
        };
        match normalize_timestamp_at(&raw, now) {
            Some(ts) => {
                tracing::trace!("Strategy {} matched {:?}", strategy.name, raw);
                return Resolution::found(ts, strategy.source);
            }
            None => {
                tracing::trace!("Strategy {} produced unusable {:?}", strategy.name, raw);
            }
        }
    }

    Resolution::none()
}
