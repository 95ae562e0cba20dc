//! Per-site recrawl intervals

use crate::config::types::RecrawlConfig;
use crate::url::strip_www;

/// Maps hosts to the minimum number of hours between deep checks
///
/// Lookup order: exact host, host without `www.`, the most specific
/// `*.domain` pattern, then the default.
#[derive(Debug, Clone)]
pub struct RecrawlPolicy {
    default_hours: u64,
    exact: Vec<(String, u64)>,
    wildcards: Vec<(String, u64)>,
}

impl RecrawlPolicy {
    pub fn new(default_hours: u64) -> Self {
        Self {
            default_hours,
            exact: Vec::new(),
            wildcards: Vec::new(),
        }
    }

    pub fn from_config(config: &RecrawlConfig) -> Self {
        let mut policy = Self::new(config.default_hours);
        for (domain, hours) in &config.domains {
            policy.insert(domain, *hours);
        }
        policy
    }

    /// Adds or replaces a domain entry
    pub fn insert(&mut self, pattern: &str, hours: u64) {
        let pattern = pattern.trim().to_ascii_lowercase();
        let wildcard_base = pattern.strip_prefix("*.").map(str::to_string);
        let (list, key) = match wildcard_base {
            Some(base) => (&mut self.wildcards, base),
            None => (&mut self.exact, pattern),
        };
        match list.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = hours,
            None => list.push((key, hours)),
        }
    }

    pub fn with_domain(mut self, pattern: &str, hours: u64) -> Self {
        self.insert(pattern, hours);
        self
    }

    pub fn default_hours(&self) -> u64 {
        self.default_hours
    }

    /// Recrawl interval for a host
    pub fn hours_for(&self, host: &str) -> u64 {
        let host = host.to_ascii_lowercase();
        let bare = strip_www(&host);

        for candidate in [host.as_str(), bare] {
            if let Some((_, hours)) = self.exact.iter().find(|(domain, _)| domain == candidate) {
                return *hours;
            }
        }

        self.wildcards
            .iter()
            .filter(|(base, _)| bare == base || bare.ends_with(&format!(".{}", base)))
            .max_by_key(|(base, _)| base.len())
            .map(|(_, hours)| *hours)
            .unwrap_or(self.default_hours)
    }
}

impl Default for RecrawlPolicy {
    fn default() -> Self {
        Self::from_config(&RecrawlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_only() {
        let policy = RecrawlPolicy::default();
        assert_eq!(policy.hours_for("example.com"), 12);
    }

    #[test]
    fn test_exact_and_www_fallback() {
        let policy = RecrawlPolicy::new(12).with_domain("news.example.com", 2);
        assert_eq!(policy.hours_for("news.example.com"), 2);
        assert_eq!(policy.hours_for("NEWS.example.com"), 2);
        assert_eq!(policy.hours_for("www.news.example.com"), 2);
        assert_eq!(policy.hours_for("example.com"), 12);
    }

    #[test]
    fn test_wildcard_most_specific_wins() {
        let policy = RecrawlPolicy::new(24)
            .with_domain("*.example.com", 6)
            .with_domain("*.blog.example.com", 1);
        assert_eq!(policy.hours_for("example.com"), 6);
        assert_eq!(policy.hours_for("api.example.com"), 6);
        assert_eq!(policy.hours_for("a.blog.example.com"), 1);
        assert_eq!(policy.hours_for("notexample.com"), 24);
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let policy = RecrawlPolicy::new(24)
            .with_domain("*.example.com", 6)
            .with_domain("docs.example.com", 48);
        assert_eq!(policy.hours_for("docs.example.com"), 48);
    }

    #[test]
    fn test_insert_replaces() {
        let mut policy = RecrawlPolicy::new(12);
        policy.insert("example.com", 3);
        policy.insert("Example.com", 4);
        assert_eq!(policy.hours_for("example.com"), 4);
    }
}
