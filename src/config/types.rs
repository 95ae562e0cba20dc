use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Sumi-Freshness
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub recrawl: RecrawlConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub feeds: FeedConfig,
    pub output: OutputConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Per-request timeouts, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// HEAD probes
    #[serde(rename = "head-secs", default = "default_head_secs")]
    pub head_secs: u64,

    /// Conditional and full page GETs
    #[serde(rename = "get-secs", default = "default_get_secs")]
    pub get_secs: u64,

    /// Feed, sitemap and robots.txt fetches
    #[serde(rename = "feed-secs", default = "default_feed_secs")]
    pub feed_secs: u64,
}

impl TimeoutConfig {
    pub fn head(&self) -> Duration {
        Duration::from_secs(self.head_secs)
    }

    pub fn get(&self) -> Duration {
        Duration::from_secs(self.get_secs)
    }

    pub fn feed(&self) -> Duration {
        Duration::from_secs(self.feed_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            head_secs: default_head_secs(),
            get_secs: default_get_secs(),
            feed_secs: default_feed_secs(),
        }
    }
}

/// Site recrawl policy: minimum hours between deep checks
#[derive(Debug, Clone, Deserialize)]
pub struct RecrawlConfig {
    #[serde(rename = "default-hours", default = "default_recrawl_hours")]
    pub default_hours: u64,

    /// Domain (or `*.domain`) to interval in hours
    #[serde(default)]
    pub domains: BTreeMap<String, u64>,
}

impl Default for RecrawlConfig {
    fn default() -> Self {
        Self {
            default_hours: default_recrawl_hours(),
            domains: BTreeMap::new(),
        }
    }
}

/// Change history configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Entries retained per URL
    #[serde(rename = "max-entries", default = "default_history_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_history_entries(),
        }
    }
}

/// Feed probing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// How long a host's feed signal stays fresh
    #[serde(rename = "cache-ttl-minutes", default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,

    /// Page prefix scanned for feed links during the lightweight check
    #[serde(rename = "probe-bytes", default = "default_probe_bytes")]
    pub probe_bytes: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: default_cache_ttl_minutes(),
            probe_bytes: default_probe_bytes(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite snapshot database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_head_secs() -> u64 {
    5
}

fn default_get_secs() -> u64 {
    15
}

fn default_feed_secs() -> u64 {
    15
}

fn default_recrawl_hours() -> u64 {
    12
}

fn default_history_entries() -> usize {
    5
}

fn default_cache_ttl_minutes() -> u64 {
    60
}

fn default_probe_bytes() -> usize {
    10 * 1024
}
