//! HTTP fetch capability
//!
//! The engine and feed prober never talk to `reqwest` directly; they go
//! through [`PageFetcher`] so tests and embedders can supply their own
//! transport. [`HttpFetcher`] is the production implementation.

mod http;

pub use http::{build_http_client, user_agent_string, HttpFetcher};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors produced by a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Validators sent with a conditional GET
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditional {
    pub if_modified_since: Option<String>,
    pub if_none_match: Option<String>,
}

impl Conditional {
    /// A plain, unconditional request
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_validators(last_modified: Option<&str>, etag: Option<&str>) -> Self {
        Self {
            if_modified_since: last_modified.map(str::to_string),
            if_none_match: etag.map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.if_modified_since.is_none() && self.if_none_match.is_none()
    }
}

/// Status, freshness headers and body of a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// At most `limit` bytes of the body, decoded lossily
    pub fn text_prefix(&self, limit: usize) -> String {
        let end = self.body.len().min(limit);
        String::from_utf8_lossy(&self.body[..end]).into_owned()
    }

    /// Media type without parameters, lowercased (`text/html; charset=utf-8` -> `text/html`)
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(media_type)
    }
}

/// Strips parameters from a content type and lowercases it
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Minimal HTTP capability required by the engine
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Sends a HEAD request
    async fn head(&self, url: &Url, timeout: Duration) -> FetchResult<FetchedResponse>;

    /// Sends a GET request, attaching any validators in `conditional`
    async fn get(
        &self,
        url: &Url,
        conditional: &Conditional,
        timeout: Duration,
    ) -> FetchResult<FetchedResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type() {
        assert_eq!(media_type("text/html; charset=UTF-8"), "text/html");
        assert_eq!(media_type(" Application/PDF "), "application/pdf");
        assert_eq!(media_type(""), "");
    }

    #[test]
    fn test_text_prefix_is_bounded() {
        let response = FetchedResponse {
            status: 200,
            body: b"<html><head>".to_vec(),
            ..Default::default()
        };
        assert_eq!(response.text_prefix(6), "<html>");
        assert_eq!(response.text_prefix(1000), "<html><head>");
    }

    #[test]
    fn test_status_helpers() {
        let ok = FetchedResponse {
            status: 204,
            ..Default::default()
        };
        let not_modified = FetchedResponse {
            status: 304,
            ..Default::default()
        };
        assert!(ok.is_success());
        assert!(!not_modified.is_success());
        assert!(not_modified.is_not_modified());
    }

    #[test]
    fn test_conditional_from_validators() {
        let c = Conditional::from_validators(None, Some("\"abc\""));
        assert!(!c.is_empty());
        assert_eq!(c.if_none_match.as_deref(), Some("\"abc\""));
        assert!(Conditional::none().is_empty());
    }
}
