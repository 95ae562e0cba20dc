//! Validator-driven refresh of a single URL

use crate::engine::{Analysis, FreshnessEngine};
use crate::fetch::{Conditional, PageFetcher};
use serde::Serialize;
use url::Url;

/// Outcome of [`FreshnessEngine::make_conditional_request`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConditionalOutcome {
    /// The server confirmed the stored validators
    NotModified {
        response_status: u16,
        last_modified_header: Option<String>,
        etag_header: Option<String>,
    },
    /// The resource changed (or could not be confirmed) and was analyzed in full
    Analyzed(Box<Analysis>),
}

impl ConditionalOutcome {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::NotModified { .. })
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            Self::Analyzed(analysis) => Some(analysis),
            Self::NotModified { .. } => None,
        }
    }
}

impl<F: PageFetcher> FreshnessEngine<F> {
    /// Checks stored validators against the server, falling back to a deep analysis
    ///
    /// A HEAD preflight answering 304, or returning both validators unchanged,
    /// settles it. Otherwise a conditional GET is sent; anything but a 304
    /// (including a failure) leads to [`analyze_page`](Self::analyze_page).
    pub async fn make_conditional_request(
        &self,
        url: &Url,
        last_modified: Option<&str>,
        etag: Option<&str>,
    ) -> ConditionalOutcome {
        let not_modified = |status: u16| ConditionalOutcome::NotModified {
            response_status: status,
            last_modified_header: last_modified.map(str::to_string),
            etag_header: etag.map(str::to_string),
        };

        match self.fetcher.head(url, self.settings.head_timeout).await {
            Ok(response) if response.is_not_modified() => return not_modified(response.status),
            Ok(response) => {
                let unchanged = matches!(
                    (last_modified, etag, response.last_modified.as_deref(), response.etag.as_deref()),
                    (Some(lm), Some(tag), Some(current_lm), Some(current_tag))
                        if lm == current_lm && tag == current_tag
                );
                if unchanged {
                    tracing::debug!("{}: validators unchanged on HEAD", url);
                    return not_modified(response.status);
                }
            }
            Err(e) => {
                tracing::debug!("HEAD preflight {} failed: {}", url, e);
            }
        }

        let conditional = Conditional::from_validators(last_modified, etag);
        match self.fetcher.get(url, &conditional, self.settings.get_timeout).await {
            Ok(response) if response.is_not_modified() => return not_modified(response.status),
            Ok(response) => {
                tracing::debug!("Conditional GET {} returned {}", url, response.status);
            }
            Err(e) => {
                tracing::debug!("Conditional GET {} failed: {}", url, e);
            }
        }

        ConditionalOutcome::Analyzed(Box::new(self.analyze_page(url).await))
    }
}
