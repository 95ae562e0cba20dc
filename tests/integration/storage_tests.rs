use crate::common::{user_agent, ARTICLE};
use std::io::Write;
use std::sync::Arc;
use sumi_freshness::config::load_config;
use sumi_freshness::engine::CheckReason;
use sumi_freshness::storage::{
    persist_history, record_evaluation, restore_history, SnapshotStore, SqliteSnapshotStore,
};
use sumi_freshness::{
    FreshnessEngine, HistoryStore, HttpFetcher, MemorySnapshotStore, RecrawlRule, Snapshot,
    Timestamp,
};
use tempfile::{NamedTempFile, TempDir};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_snapshot_round_trip_between_runs() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ARTICLE)
                .insert_header("content-type", "text/html")
                .insert_header("etag", "\"n1\""),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("snapshots.db");
    let url = Url::parse(&format!("{}/notes", server.uri())).unwrap();
    let key = url.as_str();

    // First run: baseline analysis, persisted
    {
        let history = Arc::new(HistoryStore::default());
        let fetcher = HttpFetcher::new(&user_agent()).unwrap();
        let engine = FreshnessEngine::new(fetcher, Arc::clone(&history));
        let mut store = SqliteSnapshotStore::new(&db_path).unwrap();

        let evaluation = engine.evaluate(&url, None).await;
        assert!(record_evaluation(&mut store, &evaluation).unwrap());
        persist_history(&mut store, &history, key).unwrap();
    }

    // Second run: the stored snapshot is the prior and history is restored
    let history = Arc::new(HistoryStore::default());
    let store = SqliteSnapshotStore::new(&db_path).unwrap();
    let prior = store.load(key).unwrap().expect("snapshot should be stored");
    assert_eq!(prior.etag_header.as_deref(), Some("\"n1\""));
    assert_eq!(store.urls().unwrap(), vec![key.to_string()]);
    assert_eq!(restore_history(&store, &history, key).unwrap(), 1);

    let fetcher = HttpFetcher::new(&user_agent()).unwrap();
    let engine = FreshnessEngine::new(fetcher, history);
    let evaluation = engine.evaluate(&url, Some(&prior)).await;

    // Crawled moments ago, so the recrawl interval has not elapsed
    assert_eq!(
        evaluation.analysis.lightweight_check.as_ref().map(|c| c.reason),
        Some(CheckReason::WithinRecrawlFrequency)
    );
    assert!(!evaluation.needs_recrawl());
    assert_eq!(evaluation.snapshot().content_hash, prior.content_hash);
}

#[tokio::test]
async fn test_failed_fetch_keeps_stored_snapshot() {
    let url = Url::parse("http://127.0.0.1:9/gone").unwrap();

    let mut prior = Snapshot::new(url.as_str());
    prior.content_hash = Some("c".repeat(64));
    prior.structured_hash = Some("s".repeat(64));
    prior.etag_header = Some("\"g1\"".to_string());
    prior.crawl_timestamp = Some(Timestamp::now().minus(chrono::Duration::days(10)));

    let mut store = MemorySnapshotStore::new();
    store.save(&prior).unwrap();

    let evaluation = crate::common::engine().evaluate(&url, Some(&prior)).await;
    assert!(evaluation.analysis.is_error());
    assert!(evaluation.needs_recrawl());
    assert_eq!(evaluation.decision.rule, RecrawlRule::FetchFailed);

    assert!(!record_evaluation(&mut store, &evaluation).unwrap());
    assert_eq!(store.load(url.as_str()).unwrap(), Some(prior));
}

#[tokio::test]
async fn test_engine_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[timeouts]
head-secs = 2
get-secs = 4

[recrawl]
default-hours = 48

[recrawl.domains]
"127.0.0.1" = 1

[history]
max-entries = 4

[output]
database-path = "./unused.db"
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let history = Arc::new(HistoryStore::new(config.history.max_entries));
    let fetcher = HttpFetcher::new(&config.user_agent).unwrap();
    let engine = FreshnessEngine::from_config(fetcher, history, &config);

    assert_eq!(engine.settings().head_timeout.as_secs(), 2);
    assert_eq!(engine.settings().get_timeout.as_secs(), 4);
    assert_eq!(engine.policy().hours_for("127.0.0.1"), 1);
    assert_eq!(engine.policy().hours_for("example.org"), 48);
    assert_eq!(engine.history().max_entries(), 4);
}
