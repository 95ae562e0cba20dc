//! Per-URL change history
//!
//! A bounded ring of recent fingerprints per URL. It backs two classifier
//! inputs: flapping detection (content bouncing between a few versions) and
//! the adaptive similarity threshold (how readily a page is considered
//! changed given how often it changed before).

use crate::snapshot::{Snapshot, Timestamp};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Default number of entries kept per URL
pub const DEFAULT_MAX_ENTRIES: usize = 5;

/// Similarity threshold used while a URL has fewer than two entries
pub const BASELINE_THRESHOLD: f64 = 0.8;

/// One fingerprint observation
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub content_hash: Option<String>,
    pub fuzzy_hash: Option<String>,
    pub structured_hash: Option<String>,
    pub last_updated: Option<Timestamp>,
}

impl HistoryEntry {
    pub fn from_snapshot(snapshot: &Snapshot, observed_at: Timestamp) -> Self {
        Self {
            timestamp: observed_at,
            content_hash: snapshot.content_hash.clone(),
            fuzzy_hash: snapshot.fuzzy_hash.clone(),
            structured_hash: snapshot.structured_hash.clone(),
            last_updated: snapshot.last_updated,
        }
    }
}

/// Bounded, internally synchronized history of fingerprints keyed by URL
#[derive(Debug)]
pub struct HistoryStore {
    max_entries: usize,
    entries: Mutex<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl HistoryStore {
    /// Creates a store keeping at most `max_entries` per URL (at least one)
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, VecDeque<HistoryEntry>>) -> T) -> T {
        // A poisoned lock still holds consistent data: every mutation is a
        // single push/pop.
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Appends an entry, evicting the oldest once the bound is exceeded
    pub fn record(&self, url: &str, entry: HistoryEntry) {
        let max = self.max_entries;
        self.with_entries(|entries| {
            let ring = entries.entry(url.to_string()).or_default();
            ring.push_back(entry);
            while ring.len() > max {
                ring.pop_front();
            }
        });
    }

    /// Appends an entry built from a snapshot, stamped with the current time
    pub fn record_snapshot(&self, snapshot: &Snapshot) {
        let observed_at = snapshot.crawl_timestamp.unwrap_or_else(Timestamp::now);
        self.record(&snapshot.url, HistoryEntry::from_snapshot(snapshot, observed_at));
    }

    /// Entries for a URL, oldest first
    pub fn entries(&self, url: &str) -> Vec<HistoryEntry> {
        self.with_entries(|entries| {
            entries
                .get(url)
                .map(|ring| ring.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn len(&self, url: &str) -> usize {
        self.with_entries(|entries| entries.get(url).map(VecDeque::len).unwrap_or(0))
    }

    /// True if the page keeps returning to a recently seen version
    ///
    /// Requires at least three entries; flapping means `current_hash`
    /// appears at least twice among the last three.
    pub fn is_flapping(&self, url: &str, current_hash: &str) -> bool {
        self.with_entries(|entries| {
            let Some(ring) = entries.get(url) else {
                return false;
            };
            if ring.len() < 3 {
                return false;
            }
            let hits = ring
                .iter()
                .rev()
                .take(3)
                .filter(|entry| entry.content_hash.as_deref() == Some(current_hash))
                .count();
            hits >= 2
        })
    }

    /// Similarity threshold below which a fuzzy mismatch counts as a change
    ///
    /// Pages that change on most observations get a lower threshold (0.6 or
    /// 0.7) so only substantial edits trigger a recrawl; stable pages get 0.9.
    pub fn adaptive_threshold(&self, url: &str) -> f64 {
        self.with_entries(|entries| {
            let Some(ring) = entries.get(url) else {
                return BASELINE_THRESHOLD;
            };
            if ring.len() < 2 {
                return BASELINE_THRESHOLD;
            }

            let transitions = ring
                .iter()
                .zip(ring.iter().skip(1))
                .filter(|(previous, next)| previous.content_hash != next.content_hash)
                .count();
            let change_rate = transitions as f64 / (ring.len() - 1) as f64;

            if change_rate > 0.8 {
                0.6
            } else if change_rate > 0.5 {
                0.7
            } else {
                0.9
            }
        })
    }

    /// Forgets a URL's history
    pub fn clear(&self, url: &str) {
        self.with_entries(|entries| {
            entries.remove(url);
        });
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
