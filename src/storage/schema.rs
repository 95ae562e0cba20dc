//! Database schema definitions

/// SQL schema for the snapshot database
pub const SCHEMA_SQL: &str = r#"
-- Track evaluation runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    urls_checked INTEGER NOT NULL DEFAULT 0,
    recrawls INTEGER NOT NULL DEFAULT 0
);

-- Latest snapshot per URL
CREATE TABLE IF NOT EXISTS snapshots (
    url TEXT PRIMARY KEY,
    content_hash TEXT,
    fuzzy_hash TEXT,
    structured_hash TEXT,
    last_updated TEXT,
    timestamp_source TEXT NOT NULL DEFAULT 'none',
    last_modified_header TEXT,
    etag_header TEXT,
    crawl_timestamp TEXT,
    structured_content TEXT NOT NULL DEFAULT '{}',
    response_status INTEGER,
    is_not_modified INTEGER NOT NULL DEFAULT 0,
    saved_at TEXT NOT NULL
);

-- Recent fingerprints per URL, oldest first by id
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    observed_at TEXT NOT NULL,
    content_hash TEXT,
    fuzzy_hash TEXT,
    structured_hash TEXT,
    last_updated TEXT
);

CREATE INDEX IF NOT EXISTS idx_history_url ON history(url);
"#;

/// Creates any missing tables and indexes
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
