//! Storage traits and error types

use crate::history::HistoryEntry;
use crate::snapshot::Snapshot;
use crate::storage::RunRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for the latest snapshot of each URL
///
/// The engine never writes here; the caller saves whatever snapshot an
/// evaluation returns and passes it back as the prior on the next check.
pub trait SnapshotStore {
    /// Latest snapshot for a URL, if one was saved
    fn load(&self, url: &str) -> StorageResult<Option<Snapshot>>;

    /// Inserts or replaces the snapshot for its URL
    fn save(&mut self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Deletes the snapshot and history of a URL; returns whether one existed
    fn remove(&mut self, url: &str) -> StorageResult<bool>;

    /// Every URL with a stored snapshot, sorted
    fn urls(&self) -> StorageResult<Vec<String>>;

    /// Stored history entries for a URL, oldest first
    fn load_history(&self, url: &str) -> StorageResult<Vec<HistoryEntry>>;

    /// Replaces the stored history of a URL
    fn save_history(&mut self, url: &str, entries: &[HistoryEntry]) -> StorageResult<()>;

    /// Starts a run record for a batch of evaluations
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run record with its totals
    fn finish_run(&mut self, run_id: i64, urls_checked: u64, recrawls: u64) -> StorageResult<()>;

    /// Most recently started run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
