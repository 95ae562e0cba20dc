//! Shared fixtures

use std::sync::Arc;
use sumi_freshness::config::UserAgentConfig;
use sumi_freshness::{FreshnessEngine, HistoryStore, HttpFetcher};

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

pub fn engine() -> FreshnessEngine<HttpFetcher> {
    let fetcher = HttpFetcher::new(&user_agent()).expect("Failed to build HTTP client");
    FreshnessEngine::new(fetcher, Arc::new(HistoryStore::default()))
}

pub const ARTICLE: &str = r#"<html><head>
<title>Release notes</title>
<script type="application/ld+json">{"@type": "Article", "headline": "Release notes", "dateModified": "2025-04-10T09:00:00Z"}</script>
</head><body>
<h1>Release notes</h1>
<p>Version 2.1 fixes the importer and speeds up indexing.</p>
</body></html>"#;
