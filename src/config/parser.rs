use crate::config::types::Config;
use crate::config::validation::validate;
use crate::fingerprint::sha256_hex;
use crate::ConfigError;
use std::path::Path;

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads and parses a configuration file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_freshness::config::load_config;
///
/// let config = load_config(Path::new("freshness.toml")).unwrap();
/// println!("Default recrawl interval: {}h", config.recrawl.default_hours);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Used to notice when the configuration changed between runs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(sha256_hex(content.as_bytes()))
}

/// Loads a configuration and returns both the config and the hash of the text it came from
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, sha256_hex(content.as_bytes())))
}
