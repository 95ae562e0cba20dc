//! Configuration module for Sumi-Freshness
//!
//! Loads, parses and validates the TOML configuration: user agent identity,
//! request timeouts, the per-site recrawl policy, the history bound and the
//! feed cache settings.
//!
//! # Example
//!
//! ```no_run
//! use sumi_freshness::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("freshness.toml")).unwrap();
//! println!("Snapshots stored in {}", config.output.database_path);
//! ```

mod parser;
mod policy;
mod types;
mod validation;

pub use policy::RecrawlPolicy;
pub use types::{
    Config, FeedConfig, HistoryConfig, OutputConfig, RecrawlConfig, TimeoutConfig,
    UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
