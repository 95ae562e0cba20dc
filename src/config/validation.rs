use crate::config::types::{
    Config, FeedConfig, HistoryConfig, OutputConfig, RecrawlConfig, TimeoutConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Smallest history bound that still allows flapping detection
const MIN_HISTORY_ENTRIES: usize = 3;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_timeouts(&config.timeouts)?;
    validate_recrawl(&config.recrawl)?;
    validate_history(&config.history)?;
    validate_feeds(&config.feeds)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_timeouts(config: &TimeoutConfig) -> Result<(), ConfigError> {
    for (name, secs) in [
        ("head-secs", config.head_secs),
        ("get-secs", config.get_secs),
        ("feed-secs", config.feed_secs),
    ] {
        if secs == 0 {
            return Err(ConfigError::Validation(format!(
                "timeouts.{} must be >= 1, got 0",
                name
            )));
        }
    }
    Ok(())
}

fn validate_recrawl(config: &RecrawlConfig) -> Result<(), ConfigError> {
    if config.default_hours == 0 {
        return Err(ConfigError::Validation(
            "recrawl.default-hours must be >= 1".to_string(),
        ));
    }

    for (domain, hours) in &config.domains {
        validate_domain_pattern(domain)?;
        if *hours == 0 {
            return Err(ConfigError::Validation(format!(
                "recrawl interval for '{}' must be >= 1 hour",
                domain
            )));
        }
    }

    Ok(())
}

fn validate_history(config: &HistoryConfig) -> Result<(), ConfigError> {
    if config.max_entries < MIN_HISTORY_ENTRIES {
        return Err(ConfigError::Validation(format!(
            "history.max-entries must be >= {}, got {}",
            MIN_HISTORY_ENTRIES, config.max_entries
        )));
    }
    Ok(())
}

fn validate_feeds(config: &FeedConfig) -> Result<(), ConfigError> {
    if config.cache_ttl_minutes == 0 {
        return Err(ConfigError::Validation(
            "feeds.cache-ttl-minutes must be >= 1".to_string(),
        ));
    }
    if config.probe_bytes == 0 {
        return Err(ConfigError::Validation(
            "feeds.probe-bytes must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a recrawl domain key (supports `*.` wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
