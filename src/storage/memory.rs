//! In-memory snapshot store

use crate::history::HistoryEntry;
use crate::snapshot::Snapshot;
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::RunRecord;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

/// Volatile [`SnapshotStore`] for tests and embedders without a database
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: BTreeMap<String, Snapshot>,
    history: HashMap<String, Vec<HistoryEntry>>,
    runs: Vec<RunRecord>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, url: &str) -> StorageResult<Option<Snapshot>> {
        Ok(self.snapshots.get(url).cloned())
    }

    fn save(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        self.snapshots.insert(snapshot.url.clone(), snapshot.clone());
        Ok(())
    }

    fn remove(&mut self, url: &str) -> StorageResult<bool> {
        self.history.remove(url);
        Ok(self.snapshots.remove(url).is_some())
    }

    fn urls(&self) -> StorageResult<Vec<String>> {
        Ok(self.snapshots.keys().cloned().collect())
    }

    fn load_history(&self, url: &str) -> StorageResult<Vec<HistoryEntry>> {
        Ok(self.history.get(url).cloned().unwrap_or_default())
    }

    fn save_history(&mut self, url: &str, entries: &[HistoryEntry]) -> StorageResult<()> {
        self.history.insert(url.to_string(), entries.to_vec());
        Ok(())
    }

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let id = self.runs.len() as i64 + 1;
        self.runs.push(RunRecord {
            id,
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            urls_checked: 0,
            recrawls: 0,
        });
        Ok(id)
    }

    fn finish_run(&mut self, run_id: i64, urls_checked: u64, recrawls: u64) -> StorageResult<()> {
        let run = self
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;
        run.finished_at = Some(Utc::now().to_rfc3339());
        run.urls_checked = urls_checked;
        run.recrawls = recrawls;
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(self.runs.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_remove() {
        let mut store = MemorySnapshotStore::new();
        assert!(store.is_empty());

        let snapshot = Snapshot::new("https://example.com/");
        store.save(&snapshot).unwrap();
        assert_eq!(store.load("https://example.com/").unwrap(), Some(snapshot));
        assert_eq!(store.len(), 1);

        assert!(store.remove("https://example.com/").unwrap());
        assert!(store.load("https://example.com/").unwrap().is_none());
    }

    #[test]
    fn test_unknown_run() {
        let mut store = MemorySnapshotStore::new();
        let id = store.begin_run("hash").unwrap();
        assert!(store.finish_run(id, 1, 0).is_ok());
        assert!(matches!(
            store.finish_run(id + 1, 1, 0),
            Err(StorageError::RunNotFound(_))
        ));
    }
}
