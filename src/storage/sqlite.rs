//! SQLite snapshot store

use crate::history::HistoryEntry;
use crate::snapshot::{Snapshot, StructuredContent, Timestamp, TimestampSource};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::RunRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SNAPSHOT_COLUMNS: &str = "url, content_hash, fuzzy_hash, structured_hash, last_updated, \
     timestamp_source, last_modified_header, etag_header, crawl_timestamp, structured_content, \
     response_status, is_not_modified";

/// One `snapshots` row before its text columns are decoded
struct SnapshotRow {
    url: String,
    content_hash: Option<String>,
    fuzzy_hash: Option<String>,
    structured_hash: Option<String>,
    last_updated: Option<String>,
    timestamp_source: String,
    last_modified_header: Option<String>,
    etag_header: Option<String>,
    crawl_timestamp: Option<String>,
    structured_content: String,
    response_status: Option<u16>,
    is_not_modified: bool,
}

impl SnapshotRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            content_hash: row.get(1)?,
            fuzzy_hash: row.get(2)?,
            structured_hash: row.get(3)?,
            last_updated: row.get(4)?,
            timestamp_source: row.get(5)?,
            last_modified_header: row.get(6)?,
            etag_header: row.get(7)?,
            crawl_timestamp: row.get(8)?,
            structured_content: row.get(9)?,
            response_status: row.get(10)?,
            is_not_modified: row.get(11)?,
        })
    }

    fn into_snapshot(self) -> StorageResult<Snapshot> {
        let structured_content: StructuredContent = serde_json::from_str(&self.structured_content)?;
        let timestamp_source = TimestampSource::from_str_opt(&self.timestamp_source).ok_or(
            StorageError::InvalidValue {
                column: "timestamp_source",
                value: self.timestamp_source.clone(),
            },
        )?;

        Ok(Snapshot {
            url: self.url,
            content_hash: self.content_hash,
            fuzzy_hash: self.fuzzy_hash,
            structured_hash: self.structured_hash,
            last_updated: decode_timestamp("last_updated", self.last_updated)?,
            timestamp_source,
            last_modified_header: self.last_modified_header,
            etag_header: self.etag_header,
            crawl_timestamp: decode_timestamp("crawl_timestamp", self.crawl_timestamp)?,
            structured_content,
            response_status: self.response_status,
            is_not_modified: self.is_not_modified,
        })
    }
}

fn decode_timestamp(column: &'static str, value: Option<String>) -> StorageResult<Option<Timestamp>> {
    match value {
        None => Ok(None),
        Some(value) => match Timestamp::parse_canonical(&value) {
            Some(ts) => Ok(Some(ts)),
            None => Err(StorageError::InvalidValue { column, value }),
        },
    }
}

fn encode_timestamp(ts: Option<Timestamp>) -> Option<String> {
    ts.map(|ts| ts.to_string())
}

/// SQLite-backed [`SnapshotStore`], one row per URL
pub struct SqliteSnapshotStore {
    conn: Connection,
}

impl SqliteSnapshotStore {
    /// Opens (or creates) a database file and ensures the schema exists
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self, url: &str) -> StorageResult<Option<Snapshot>> {
        let sql = format!("SELECT {} FROM snapshots WHERE url = ?1", SNAPSHOT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![url], SnapshotRow::from_row)
            .optional()?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }

    fn save(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        let structured_content = serde_json::to_string(&snapshot.structured_content)?;
        self.conn.execute(
            "INSERT INTO snapshots (url, content_hash, fuzzy_hash, structured_hash, last_updated,
                 timestamp_source, last_modified_header, etag_header, crawl_timestamp,
                 structured_content, response_status, is_not_modified, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(url) DO UPDATE SET
                 content_hash = excluded.content_hash,
                 fuzzy_hash = excluded.fuzzy_hash,
                 structured_hash = excluded.structured_hash,
                 last_updated = excluded.last_updated,
                 timestamp_source = excluded.timestamp_source,
                 last_modified_header = excluded.last_modified_header,
                 etag_header = excluded.etag_header,
                 crawl_timestamp = excluded.crawl_timestamp,
                 structured_content = excluded.structured_content,
                 response_status = excluded.response_status,
                 is_not_modified = excluded.is_not_modified,
                 saved_at = excluded.saved_at",
            params![
                snapshot.url,
                snapshot.content_hash,
                snapshot.fuzzy_hash,
                snapshot.structured_hash,
                encode_timestamp(snapshot.last_updated),
                snapshot.timestamp_source.as_str(),
                snapshot.last_modified_header,
                snapshot.etag_header,
                encode_timestamp(snapshot.crawl_timestamp),
                structured_content,
                snapshot.response_status,
                snapshot.is_not_modified,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn remove(&mut self, url: &str) -> StorageResult<bool> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM snapshots WHERE url = ?1", params![url])?;
        tx.execute("DELETE FROM history WHERE url = ?1", params![url])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn urls(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM snapshots ORDER BY url")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn load_history(&self, url: &str) -> StorageResult<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT observed_at, content_hash, fuzzy_hash, structured_hash, last_updated
             FROM history WHERE url = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![url], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(observed_at, content_hash, fuzzy_hash, structured_hash, last_updated)| {
                let timestamp = Timestamp::parse_canonical(&observed_at).ok_or_else(|| {
                    StorageError::InvalidValue {
                        column: "observed_at",
                        value: observed_at.clone(),
                    }
                })?;
                Ok(HistoryEntry {
                    timestamp,
                    content_hash,
                    fuzzy_hash,
                    structured_hash,
                    last_updated: decode_timestamp("last_updated", last_updated)?,
                })
            })
            .collect()
    }

    fn save_history(&mut self, url: &str, entries: &[HistoryEntry]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM history WHERE url = ?1", params![url])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO history (url, observed_at, content_hash, fuzzy_hash, structured_hash, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    url,
                    entry.timestamp.to_string(),
                    entry.content_hash,
                    entry.fuzzy_hash,
                    entry.structured_hash,
                    encode_timestamp(entry.last_updated),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash) VALUES (?1, ?2)",
            params![Utc::now().to_rfc3339(), config_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, urls_checked: u64, recrawls: u64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1, urls_checked = ?2, recrawls = ?3 WHERE id = ?4",
            params![
                Utc::now().to_rfc3339(),
                urls_checked as i64,
                recrawls as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, urls_checked, recrawls
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        urls_checked: row.get::<_, i64>(4)? as u64,
                        recrawls: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}
