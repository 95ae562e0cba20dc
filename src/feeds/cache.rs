//! Per-host feed signal cache
//!
//! Feed probing costs up to five fetches, so each host's signal is cached
//! for a configurable TTL (one hour by default).

use crate::feeds::FeedSignal;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Default time a feed signal stays fresh
pub const DEFAULT_FEED_TTL_MINUTES: i64 = 60;

/// A feed signal together with the time it was produced
#[derive(Debug, Clone)]
pub struct CachedFeedSignal {
    pub signal: FeedSignal,
    pub fetched_at: DateTime<Utc>,
}

impl CachedFeedSignal {
    pub fn new(signal: FeedSignal) -> Self {
        Self {
            signal,
            fetched_at: Utc::now(),
        }
    }

    /// True once the entry is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// TTL cache of feed signals keyed by host
#[derive(Debug)]
pub struct FeedCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedFeedSignal>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl_minutes(minutes: u64) -> Self {
        let minutes = i64::try_from(minutes)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 60_000);
        Self::new(Duration::minutes(minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedFeedSignal>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fresh signal for a host, if any; stale entries are evicted
    pub fn get(&self, host: &str) -> Option<FeedSignal> {
        let mut entries = self.lock();
        let lookup = entries
            .get(host)
            .map(|cached| (!cached.is_stale(self.ttl)).then(|| cached.signal.clone()));
        match lookup {
            Some(Some(signal)) => Some(signal),
            Some(None) => {
                entries.remove(host);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, host: &str, signal: FeedSignal) {
        self.lock()
            .insert(host.to_string(), CachedFeedSignal::new(signal));
    }

    /// Inserts an entry with an explicit fetch time
    pub fn insert_at(&self, host: &str, signal: FeedSignal, fetched_at: DateTime<Utc>) {
        self.lock()
            .insert(host.to_string(), CachedFeedSignal { signal, fetched_at });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_FEED_TTL_MINUTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Timestamp;

    fn signal() -> FeedSignal {
        FeedSignal {
            feed_urls: Vec::new(),
            latest: Timestamp::parse_canonical("2024-12-01 00:00:00 UTC"),
        }
    }

    #[test]
    fn test_fresh_entry_is_served() {
        let cache = FeedCache::default();
        cache.insert("example.com", signal());
        assert_eq!(cache.get("example.com"), Some(signal()));
        assert_eq!(cache.get("other.com"), None);
    }

    #[test]
    fn test_stale_entry_is_evicted() {
        let cache = FeedCache::default();
        cache.insert_at("example.com", signal(), Utc::now() - Duration::minutes(61));
        assert_eq!(cache.get("example.com"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_not_stale_just_inside_ttl() {
        let cache = FeedCache::new(Duration::minutes(30));
        cache.insert_at("example.com", signal(), Utc::now() - Duration::minutes(29));
        assert!(cache.get("example.com").is_some());
    }

    #[test]
    fn test_age() {
        let mut cached = CachedFeedSignal::new(signal());
        cached.fetched_at = Utc::now() - Duration::minutes(90);
        let age = cached.age();
        assert!(age.num_minutes() >= 89 && age.num_minutes() <= 91);
        assert!(cached.is_stale(Duration::hours(1)));
    }
}
