//! URL helpers for Sumi-Freshness
//!
//! This module provides page URL parsing, host extraction, same-host checks
//! and the loose matching used when comparing sitemap entries.

mod domain;
mod variants;

pub use domain::{extract_domain, same_host, strip_www};
pub use variants::{loosely_equal, resolve_against};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a page URL, accepting only HTTP and HTTPS schemes
///
/// # Examples
///
/// ```
/// use sumi_freshness::url::parse_page_url;
///
/// assert!(parse_page_url("https://example.com/news").is_ok());
/// assert!(parse_page_url("ftp://example.com/file").is_err());
/// ```
pub fn parse_page_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
