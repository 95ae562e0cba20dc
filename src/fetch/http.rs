//! `reqwest`-backed fetcher

use crate::config::UserAgentConfig;
use crate::fetch::{Conditional, FetchError, FetchResult, FetchedResponse, PageFetcher};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{redirect::Policy, Client, RequestBuilder};
use std::time::Duration;
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Formats the crawler identity: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with the crawler's identity
///
/// Per-request timeouts are applied by [`HttpFetcher`]; the client-level
/// timeout only bounds runaway transfers.
///
/// # Example
///
/// ```no_run
/// use sumi_freshness::config::UserAgentConfig;
/// use sumi_freshness::fetch::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "FreshBot".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Production [`PageFetcher`] over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        with_body: bool,
    ) -> FetchResult<FetchedResponse> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let body = if with_body {
            response
                .bytes()
                .await
                .map_err(|e| classify_error(e, timeout))?
                .to_vec()
        } else {
            Vec::new()
        };

        Ok(FetchedResponse {
            status,
            last_modified: header_value(&headers, LAST_MODIFIED),
            etag: header_value(&headers, ETAG),
            content_type: header_value(&headers, CONTENT_TYPE),
            body,
        })
    }
}

fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else {
        FetchError::Http(error)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn head(&self, url: &Url, timeout: Duration) -> FetchResult<FetchedResponse> {
        self.send(self.client.head(url.clone()), timeout, false).await
    }

    async fn get(
        &self,
        url: &Url,
        conditional: &Conditional,
        timeout: Duration,
    ) -> FetchResult<FetchedResponse> {
        let mut request = self.client.get(url.clone());
        if let Some(since) = &conditional.if_modified_since {
            request = request.header(IF_MODIFIED_SINCE, since.as_str());
        }
        if let Some(etag) = &conditional.if_none_match {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }
        self.send(request, timeout, true).await
    }
}
