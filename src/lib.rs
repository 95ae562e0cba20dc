//! Sumi-Freshness: staleness and change detection for crawled pages
//!
//! This crate decides whether a previously observed web page has meaningfully
//! changed since its last snapshot, and whether it is worth re-fetching and
//! re-processing. It combines cheap header/feed checks with a deep multi-signal
//! fingerprint, a priority-ordered "last updated" resolver and a change
//! classification cascade.

pub mod classify;
pub mod config;
pub mod engine;
pub mod feeds;
pub mod fetch;
pub mod fingerprint;
pub mod history;
pub mod snapshot;
pub mod storage;
pub mod timestamp;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Freshness operations
#[derive(Debug, Error)]
pub enum FreshnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain in recrawl policy: {0}")]
    InvalidDomain(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Freshness operations
pub type Result<T> = std::result::Result<T, FreshnessError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use classify::{has_content_changed, should_recrawl, RecrawlDecision, RecrawlRule};
pub use config::Config;
pub use engine::{Analysis, Evaluation, FreshnessEngine};
pub use fetch::{HttpFetcher, PageFetcher};
pub use history::HistoryStore;
pub use snapshot::{Snapshot, Timestamp, TimestampSource};
pub use storage::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
