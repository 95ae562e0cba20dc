//! Sumi-Freshness main entry point
//!
//! Command-line front end: loads the config, opens the snapshot database and
//! runs each URL through the freshness engine.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_freshness::config::{load_config_with_hash, Config};
use sumi_freshness::storage::{
    open_store, persist_history, record_evaluation, restore_history, SnapshotStore,
    SqliteSnapshotStore,
};
use sumi_freshness::url::parse_page_url;
use sumi_freshness::{Evaluation, FreshnessEngine, HistoryStore};
use tracing_subscriber::EnvFilter;

/// Sumi-Freshness: decides whether crawled pages need recrawling
///
/// Each URL gets a cheap header/feed check first and a full fingerprint only
/// when something may have changed. Snapshots are kept in the configured
/// SQLite database between runs.
#[derive(Parser, Debug)]
#[command(name = "sumi-freshness")]
#[command(version = "1.0.0")]
#[command(about = "Staleness and change detection for crawled pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to evaluate
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Re-evaluate every URL already in the database
    #[arg(long)]
    all: bool,

    /// Print each evaluation as a JSON line
    #[arg(long)]
    json: bool,

    /// Validate config and show what would be evaluated
    #[arg(long, conflicts_with_all = ["stats", "sitemap"])]
    dry_run: bool,

    /// Show stored snapshots and the last run, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "sitemap"])]
    stats: bool,

    /// Print sitemap lastmod values for a site and exit
    #[arg(long, value_name = "SITE", conflicts_with_all = ["dry_run", "stats"])]
    sitemap: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.urls);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(site) = cli.sitemap.as_deref() {
        handle_sitemap(&config, site).await?;
    } else {
        handle_evaluate(&config, &config_hash, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_freshness=info,warn"),
            1 => EnvFilter::new("sumi_freshness=debug,info"),
            2 => EnvFilter::new("sumi_freshness=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn handle_dry_run(config: &Config, urls: &[String]) {
    println!("=== Sumi-Freshness Dry Run ===\n");

    println!("User Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nTimeouts:");
    println!("  HEAD: {}s", config.timeouts.head_secs);
    println!("  GET: {}s", config.timeouts.get_secs);
    println!("  Feed: {}s", config.timeouts.feed_secs);

    println!("\nRecrawl Policy:");
    println!("  Default: {}h", config.recrawl.default_hours);
    for (domain, hours) in &config.recrawl.domains {
        println!("  - {}: {}h", domain, hours);
    }

    println!("\nHistory entries per URL: {}", config.history.max_entries);
    println!("Feed cache TTL: {} min", config.feeds.cache_ttl_minutes);
    println!("Database: {}", config.output.database_path);

    println!("\nURLs ({}):", urls.len());
    for url in urls {
        match parse_page_url(url) {
            Ok(parsed) => println!("  - {}", parsed),
            Err(e) => println!("  ! {} ({})", url, e),
        }
    }

    println!("\n✓ Configuration is valid");
}

fn handle_stats(config: &Config) -> Result<()> {
    let store = open_database(config)?;
    println!("Database: {}\n", config.output.database_path);

    match store.latest_run()? {
        Some(run) => {
            println!("Last run #{} started {}", run.id, run.started_at);
            match run.finished_at {
                Some(finished) => println!(
                    "  finished {}: {} checked, {} needing recrawl",
                    finished, run.urls_checked, run.recrawls
                ),
                None => println!("  did not finish"),
            }
        }
        None => println!("No runs recorded"),
    }

    let urls = store.urls()?;
    println!("\nSnapshots ({}):", urls.len());
    for url in urls {
        let Some(snapshot) = store.load(&url)? else {
            continue;
        };
        let crawled = snapshot
            .crawl_timestamp
            .map(|ts| ts.to_string())
            .unwrap_or_else(|| "never".to_string());
        let updated = snapshot
            .last_updated
            .map(|ts| format!("{} ({})", ts, snapshot.timestamp_source.as_str()))
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {}\n    crawled: {}\n    updated: {}", url, crawled, updated);
    }

    Ok(())
}

async fn handle_sitemap(config: &Config, site: &str) -> Result<()> {
    let base = parse_page_url(site).with_context(|| format!("invalid site URL {}", site))?;
    let history = Arc::new(HistoryStore::new(config.history.max_entries));
    let engine = FreshnessEngine::http(config, history).context("failed to build engine")?;

    let data = engine.sitemap_data(&base).await;
    println!("{} sitemap entries with lastmod", data.len());
    for (url, lastmod) in data.iter() {
        println!("  {}  {}", lastmod, url);
    }
    Ok(())
}

async fn handle_evaluate(config: &Config, config_hash: &str, cli: &Cli) -> Result<()> {
    let mut store = open_database(config)?;

    let mut targets = cli.urls.clone();
    if cli.all {
        for url in store.urls()? {
            if !targets.contains(&url) {
                targets.push(url);
            }
        }
    }
    if targets.is_empty() {
        anyhow::bail!("no URLs given (pass URLs or --all)");
    }

    let history = Arc::new(HistoryStore::new(config.history.max_entries));
    let engine =
        FreshnessEngine::http(config, Arc::clone(&history)).context("failed to build engine")?;

    let run_id = store.begin_run(config_hash)?;
    tracing::info!("Starting run {} over {} URLs", run_id, targets.len());

    let mut checked = 0u64;
    let mut recrawls = 0u64;

    for target in &targets {
        let url = match parse_page_url(target) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Skipping {}: {}", target, e);
                continue;
            }
        };
        let key = url.as_str();

        let prior = match store.load(key) {
            Ok(prior) => prior,
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot for {}: {}", key, e);
                None
            }
        };
        if let Err(e) = restore_history(&store, &history, key) {
            tracing::warn!("Ignoring unreadable history for {}: {}", key, e);
        }

        let evaluation = engine.evaluate(&url, prior.as_ref()).await;
        report(&evaluation, cli.json)?;

        checked += 1;
        if evaluation.needs_recrawl() {
            recrawls += 1;
        }

        match record_evaluation(&mut store, &evaluation) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Keeping previous snapshot for {} after failed fetch", key),
            Err(e) => tracing::warn!("Failed to save snapshot for {}: {}", key, e),
        }
        if let Err(e) = persist_history(&mut store, &history, key) {
            tracing::warn!("Failed to save history for {}: {}", key, e);
        }
    }

    store.finish_run(run_id, checked, recrawls)?;
    tracing::info!(
        "Run {} complete: {} checked, {} need recrawl",
        run_id,
        checked,
        recrawls
    );

    Ok(())
}

fn open_database(config: &Config) -> Result<SqliteSnapshotStore> {
    let path = Path::new(&config.output.database_path);
    open_store(path).with_context(|| format!("failed to open database {}", path.display()))
}

fn report(evaluation: &Evaluation, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(evaluation)?);
        return Ok(());
    }

    let snapshot = evaluation.snapshot();
    let verdict = if evaluation.needs_recrawl() {
        "RECRAWL"
    } else {
        "fresh"
    };
    println!(
        "{:8} {} [{}]",
        verdict,
        snapshot.url,
        evaluation.decision.rule.as_str()
    );
    if let Some(updated) = snapshot.last_updated {
        println!(
            "         last updated {} via {}",
            updated,
            snapshot.timestamp_source.as_str()
        );
    }
    if let Some(error) = &evaluation.analysis.error {
        println!("         error: {}", error);
    }
    Ok(())
}
