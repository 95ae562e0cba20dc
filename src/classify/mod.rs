//! Change classification
//!
//! [`should_recrawl`] walks a fixed cascade of rules comparing a prior
//! snapshot with a fresh one; the first decisive rule wins. The decision
//! records which rule fired so callers can log or audit it.

mod identifier;

pub use identifier::{
    has_content_changed, last_modified_from_identifier, Identifier, CONTENT_HASH_KEY, ETAG_KEY,
    FUZZY_HASH_KEY, LAST_MODIFIED_KEY, STRUCTURED_HASH_KEY,
};

use crate::fingerprint::similarity;
use crate::history::HistoryStore;
use crate::snapshot::{Snapshot, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Crawls younger than this are not repeated for pages without timestamps
const UNDATED_RECRAWL_HOURS: i64 = 24;

/// The cascade rule that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecrawlRule {
    /// No prior snapshot to compare against
    NoPriorSnapshot,
    StructuredHashChanged,
    FuzzyBelowThreshold,
    Flapping,
    ContentHashChanged,
    LastUpdatedUnchanged,
    ValidatorsUnchanged,
    UpdatedBeforeLastCrawl,
    UndatedRecentCrawl,
    UndatedStaleCrawl,
    UndatedNoBaseline,
    Default,
    /// Phase 1 showed nothing new, so no comparison ran
    NotModified,
    /// The fetch failed, so there was nothing to compare
    FetchFailed,
}

impl RecrawlRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPriorSnapshot => "no_prior_snapshot",
            Self::StructuredHashChanged => "structured_hash_changed",
            Self::FuzzyBelowThreshold => "fuzzy_below_threshold",
            Self::Flapping => "flapping",
            Self::ContentHashChanged => "content_hash_changed",
            Self::LastUpdatedUnchanged => "last_updated_unchanged",
            Self::ValidatorsUnchanged => "validators_unchanged",
            Self::UpdatedBeforeLastCrawl => "updated_before_last_crawl",
            Self::UndatedRecentCrawl => "undated_recent_crawl",
            Self::UndatedStaleCrawl => "undated_stale_crawl",
            Self::UndatedNoBaseline => "undated_no_baseline",
            Self::Default => "default",
            Self::NotModified => "not_modified",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

/// Whether to recrawl, and why
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecrawlDecision {
    pub recrawl: bool,
    pub rule: RecrawlRule,
}

impl RecrawlDecision {
    fn recrawl(rule: RecrawlRule) -> Self {
        Self { recrawl: true, rule }
    }

    fn skip(rule: RecrawlRule) -> Self {
        Self {
            recrawl: false,
            rule,
        }
    }

    /// Decision used when there is nothing to compare against
    pub fn baseline() -> Self {
        Self::recrawl(RecrawlRule::NoPriorSnapshot)
    }

    /// Decision used when the lightweight check found nothing new
    pub fn unchanged() -> Self {
        Self::skip(RecrawlRule::NotModified)
    }

    /// Decision used when the page could not be fetched; retry next time
    pub fn fetch_failed() -> Self {
        Self::recrawl(RecrawlRule::FetchFailed)
    }
}

fn equal_present<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// Decides whether a page should be recrawled given its prior and fresh snapshots
pub fn should_recrawl(old: &Snapshot, new: &Snapshot, history: &HistoryStore) -> RecrawlDecision {
    should_recrawl_at(old, new, history, Timestamp::now())
}

/// [`should_recrawl`] with an explicit clock
pub fn should_recrawl_at(
    old: &Snapshot,
    new: &Snapshot,
    history: &HistoryStore,
    now: Timestamp,
) -> RecrawlDecision {
    if old.structured_hash != new.structured_hash {
        return RecrawlDecision::recrawl(RecrawlRule::StructuredHashChanged);
    }

    if let (Some(old_fuzzy), Some(new_fuzzy)) = (&old.fuzzy_hash, &new.fuzzy_hash) {
        let old_text = old.canonical_content();
        let new_text = new.canonical_content();
        if old_fuzzy != new_fuzzy && !old_text.is_empty() && !new_text.is_empty() {
            let score = similarity(old_text, new_text);
            let threshold = history.adaptive_threshold(&new.url);
            if score < threshold {
                tracing::debug!(
                    "Similarity {:.3} below threshold {:.1} for {}",
                    score,
                    threshold,
                    new.url
                );
                return RecrawlDecision::recrawl(RecrawlRule::FuzzyBelowThreshold);
            }
        }
    }

    if let Some(hash) = new.content_hash.as_deref() {
        if history.is_flapping(&new.url, hash) {
            return RecrawlDecision::skip(RecrawlRule::Flapping);
        }
    }

    if old.content_hash != new.content_hash {
        return RecrawlDecision::recrawl(RecrawlRule::ContentHashChanged);
    }

    if equal_present(&old.last_updated, &new.last_updated) {
        return RecrawlDecision::skip(RecrawlRule::LastUpdatedUnchanged);
    }

    if equal_present(&old.last_modified_header, &new.last_modified_header)
        || equal_present(&old.etag_header, &new.etag_header)
    {
        return RecrawlDecision::skip(RecrawlRule::ValidatorsUnchanged);
    }

    if let (Some(last_crawl), Some(updated)) = (old.crawl_timestamp, new.last_updated) {
        if updated < last_crawl {
            return RecrawlDecision::skip(RecrawlRule::UpdatedBeforeLastCrawl);
        }
    }

    if !old.has_reliable_timestamp() && !new.has_reliable_timestamp() {
        return match old.crawl_timestamp {
            Some(last_crawl) if now.since(&last_crawl) < Duration::hours(UNDATED_RECRAWL_HOURS) => {
                RecrawlDecision::skip(RecrawlRule::UndatedRecentCrawl)
            }
            Some(_) => RecrawlDecision::recrawl(RecrawlRule::UndatedStaleCrawl),
            None => RecrawlDecision::recrawl(RecrawlRule::UndatedNoBaseline),
        };
    }

    RecrawlDecision::recrawl(RecrawlRule::Default)
}
