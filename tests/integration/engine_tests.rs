use crate::common::{engine, ARTICLE};
use chrono::{Duration, Utc};
use sumi_freshness::engine::{AnalysisPhase, CheckReason, ConditionalOutcome};
use sumi_freshness::{RecrawlRule, Snapshot, Timestamp, TimestampSource};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAST_MODIFIED: &str = "Thu, 10 Apr 2025 09:00:00 GMT";

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_html_head(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(server)
        .await;
}

fn page_url(server: &MockServer, page: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page)).expect("Failed to parse mock URL")
}

#[tokio::test]
async fn test_no_previous_data_runs_deep_analysis() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(html(ARTICLE).insert_header("last-modified", LAST_MODIFIED))
        .mount(&server)
        .await;

    let engine = engine();
    let url = page_url(&server, "/notes");
    let evaluation = engine.evaluate(&url, None).await;

    let check = evaluation.analysis.lightweight_check.as_ref().unwrap();
    assert!(check.needs_deep_check);
    assert_eq!(check.reason, CheckReason::NoPreviousData);

    assert!(evaluation.needs_recrawl());
    assert_eq!(evaluation.decision.rule, RecrawlRule::NoPriorSnapshot);
    assert_eq!(evaluation.analysis.phase, AnalysisPhase::Deep);

    let snapshot = evaluation.snapshot();
    assert_eq!(snapshot.response_status, Some(200));
    assert_eq!(snapshot.last_modified_header.as_deref(), Some(LAST_MODIFIED));
    assert_eq!(
        snapshot.last_updated.map(|ts| ts.to_string()).as_deref(),
        Some("2025-04-10 09:00:00 UTC")
    );
    assert_eq!(snapshot.timestamp_source, TimestampSource::Schema);
    assert!(snapshot.content_hash.is_some());
    assert!(snapshot.fuzzy_hash.is_some());
    assert!(snapshot.structured_hash.is_some());
    assert!(evaluation.analysis.identifier.starts_with("last_modified_header:"));
    assert_eq!(engine.history().len(url.as_str()), 1);
}

#[tokio::test]
async fn test_headers_unchanged_skips_deep_check() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/docs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("etag", "\"abc\"")
                .insert_header("last-modified", LAST_MODIFIED),
        )
        .mount(&server)
        .await;

    let url = page_url(&server, "/docs");
    let mut prior = Snapshot::new(url.as_str());
    prior.etag_header = Some("\"abc\"".to_string());
    prior.last_modified_header = Some(LAST_MODIFIED.to_string());
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::days(30)));

    let engine = engine();
    let check = engine.check_lightweight(&url, Some(&prior)).await;
    assert!(!check.needs_deep_check);
    assert_eq!(check.reason, CheckReason::HeadersUnchanged);

    let evaluation = engine.evaluate(&url, Some(&prior)).await;
    assert!(!evaluation.needs_recrawl());
    assert_eq!(evaluation.decision.rule, RecrawlRule::NotModified);
    assert_eq!(evaluation.analysis.phase, AnalysisPhase::Lightweight);
    assert!(evaluation.snapshot().is_not_modified);
}

#[tokio::test]
async fn test_conditional_get_not_modified() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .and(header("if-none-match", "\"v2\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let url = page_url(&server, "/docs");
    let mut prior = Snapshot::new(url.as_str());
    prior.etag_header = Some("\"v2\"".to_string());
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::days(30)));

    let check = engine().check_lightweight(&url, Some(&prior)).await;
    assert!(!check.needs_deep_check);
    assert_eq!(check.reason, CheckReason::NotModified);
}

#[tokio::test]
async fn test_feed_newer_than_last_crawl() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;

    let updated = (Utc::now() - Duration::hours(1)).format("%Y-%m-%dT%H:%M:%SZ");
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"><updated>{}</updated></feed>"#,
                    updated
                ))
                .insert_header("content-type", "application/atom+xml"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(html(
            r#"<html><head><link rel="alternate" type="application/atom+xml" href="/feed.xml"></head><body>Blog</body></html>"#,
        ))
        .mount(&server)
        .await;

    let url = page_url(&server, "/blog");
    let mut prior = Snapshot::new(url.as_str());
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::hours(3)));

    let engine = engine();
    let check = engine.check_lightweight(&url, Some(&prior)).await;
    assert!(check.needs_deep_check);
    assert_eq!(check.reason, CheckReason::RssNewerThanCrawl);
    assert!(check.rss_timestamp.is_some());

    // The signal is now cached for the host
    assert_eq!(engine.feed_cache().len(), 1);
}

#[tokio::test]
async fn test_recent_crawl_within_recrawl_frequency() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<html><body><p>About us</p></body></html>"))
        .mount(&server)
        .await;

    let url = page_url(&server, "/about");
    let mut prior = Snapshot::new(url.as_str());
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::hours(2)));

    let check = engine().check_lightweight(&url, Some(&prior)).await;
    assert!(!check.needs_deep_check);
    assert_eq!(check.reason, CheckReason::WithinRecrawlFrequency);
    assert!(check.hours_since_crawl.unwrap() >= 2.0);
}

#[tokio::test]
async fn test_unchanged_page_is_not_recrawled() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(html(ARTICLE))
        .mount(&server)
        .await;

    let engine = engine();
    let url = page_url(&server, "/notes");
    let first = engine.evaluate(&url, None).await;

    let mut prior = first.snapshot().clone();
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::hours(13)));

    let second = engine.evaluate(&url, Some(&prior)).await;
    assert_eq!(
        second.analysis.lightweight_check.as_ref().map(|c| c.reason),
        Some(CheckReason::DefaultCheckNeeded)
    );
    assert_eq!(second.analysis.phase, AnalysisPhase::Deep);
    assert!(!second.needs_recrawl());
    assert_eq!(second.decision.rule, RecrawlRule::LastUpdatedUnchanged);
    assert_eq!(engine.history().len(url.as_str()), 2);
}

#[tokio::test]
async fn test_structural_change_is_recrawled() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(html(ARTICLE))
        .mount(&server)
        .await;

    let url = page_url(&server, "/notes");
    let mut prior = Snapshot::new(url.as_str());
    prior.structured_hash = Some("0".repeat(64));
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::days(10)));

    let evaluation = engine().evaluate(&url, Some(&prior)).await;
    assert_eq!(
        evaluation.analysis.lightweight_check.as_ref().map(|c| c.reason),
        Some(CheckReason::OldCrawl)
    );
    assert!(evaluation.needs_recrawl());
    assert_eq!(evaluation.decision.rule, RecrawlRule::StructuredHashChanged);
}

#[tokio::test]
async fn test_non_html_resource_uses_raw_branch() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.7 quarterly report".to_vec())
                .insert_header("content-type", "application/pdf")
                .insert_header("last-modified", LAST_MODIFIED),
        )
        .mount(&server)
        .await;

    let url = page_url(&server, "/report.pdf");
    let mut prior = Snapshot::new(url.as_str());
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::hours(1)));

    let evaluation = engine().evaluate(&url, Some(&prior)).await;
    let analysis = &evaluation.analysis;
    assert_eq!(
        analysis.lightweight_check.as_ref().map(|c| c.reason),
        Some(CheckReason::NonHtmlContent)
    );
    assert_eq!(analysis.phase, AnalysisPhase::Raw);
    assert_eq!(analysis.content_type.as_deref(), Some("application/pdf"));
    assert!(analysis.error.is_none());

    let snapshot = evaluation.snapshot();
    assert!(snapshot.content_hash.is_some());
    assert!(snapshot.fuzzy_hash.is_none());
    assert!(snapshot.structured_hash.is_none());
    assert_eq!(snapshot.timestamp_source, TimestampSource::HttpHeader);
    assert!(evaluation.needs_recrawl());
}

#[tokio::test]
async fn test_make_conditional_request() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/stable"))
        .and(header("if-modified-since", LAST_MODIFIED))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(html(ARTICLE))
        .mount(&server)
        .await;

    let engine = engine();

    let outcome = engine
        .make_conditional_request(&page_url(&server, "/stable"), Some(LAST_MODIFIED), None)
        .await;
    assert_eq!(
        outcome,
        ConditionalOutcome::NotModified {
            response_status: 304,
            last_modified_header: Some(LAST_MODIFIED.to_string()),
            etag_header: None,
        }
    );

    let outcome = engine
        .make_conditional_request(&page_url(&server, "/notes"), Some(LAST_MODIFIED), None)
        .await;
    let analysis = outcome.analysis().expect("changed page should be analyzed");
    assert_eq!(analysis.phase, AnalysisPhase::Deep);
    assert_eq!(analysis.snapshot.timestamp_source, TimestampSource::Schema);
}

#[tokio::test]
async fn test_unreachable_host_still_yields_verdict() {
    let url = Url::parse("http://127.0.0.1:9/gone").unwrap();
    let evaluation = engine().evaluate(&url, None).await;

    assert!(evaluation.needs_recrawl());
    assert_eq!(evaluation.decision.rule, RecrawlRule::FetchFailed);
    assert!(evaluation.analysis.error.is_some());
    assert!(evaluation.snapshot().content_hash.is_none());
}

#[tokio::test]
async fn test_error_page_is_not_a_content_change() {
    let server = MockServer::start().await;
    mount_html_head(&server).await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("<html><body><h1>Internal Server Error</h1></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let url = page_url(&server, "/status");
    let mut prior = Snapshot::new(url.as_str());
    prior.structured_hash = Some("0".repeat(64));
    prior.crawl_timestamp = Some(Timestamp::now().minus(Duration::days(10)));

    let engine = engine();
    let evaluation = engine.evaluate(&url, Some(&prior)).await;
    assert!(evaluation.needs_recrawl());
    assert_eq!(evaluation.decision.rule, RecrawlRule::FetchFailed);
    assert_eq!(evaluation.snapshot().response_status, Some(500));
    assert_eq!(engine.history().len(url.as_str()), 0);
}
