//! Snapshot persistence
//!
//! The engine hands back a fresh [`Snapshot`](crate::snapshot::Snapshot) after
//! every evaluation; a [`SnapshotStore`] keeps the latest one per URL, the
//! per-URL fingerprint history, and a record of each evaluation run.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;
pub use traits::{SnapshotStore, StorageError, StorageResult};

use crate::engine::Evaluation;
use crate::history::HistoryStore;
use std::path::Path;

/// Opens or creates the SQLite snapshot database at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteSnapshotStore> {
    SqliteSnapshotStore::new(path)
}

/// Saves the snapshot produced by `evaluation` unless its fetch failed
///
/// A failed fetch leaves the stored snapshot in place so the next run still
/// has a baseline. Returns whether anything was written.
pub fn record_evaluation(
    store: &mut dyn SnapshotStore,
    evaluation: &Evaluation,
) -> StorageResult<bool> {
    if evaluation.analysis.is_error() {
        return Ok(false);
    }
    store.save(evaluation.snapshot())?;
    Ok(true)
}

/// Loads the stored history of `url` into the in-memory history store
pub fn restore_history(
    store: &dyn SnapshotStore,
    history: &HistoryStore,
    url: &str,
) -> StorageResult<usize> {
    history.clear(url);
    let entries = store.load_history(url)?;
    let count = entries.len();
    for entry in entries {
        history.record(url, entry);
    }
    Ok(count)
}

/// Writes the in-memory history of `url` back to the store
pub fn persist_history(
    store: &mut dyn SnapshotStore,
    history: &HistoryStore,
    url: &str,
) -> StorageResult<()> {
    store.save_history(url, &history.entries(url))
}

/// One evaluation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub urls_checked: u64,
    pub recrawls: u64,
}
