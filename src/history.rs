use bevy::prelude::*;
use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::stats::HistoryLog;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io: {0}")]
    Io(#[from] io::Error),
    #[error("history encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Opaque persistence for the session history.
///
/// `load` never fails: a missing or unreadable log is an empty history.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> HistoryLog;
    fn save(&self, log: &HistoryLog) -> Result<(), HistoryError>;
}

fn decode(bytes: &[u8]) -> HistoryLog {
    match serde_json::from_slice::<HistoryLog>(bytes) {
        Ok(mut log) => {
            log.enforce_capacity();
            log
        }
        Err(err) => {
            warn!("Ignoring unreadable session history: {err}");
            HistoryLog::default()
        }
    }
}

// --- File Store ---

#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(dirs) = ProjectDirs::from("", "", "strac_aim") {
            dirs.data_local_dir().join("history.json")
        } else {
            PathBuf::from("strac_aim_history.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> HistoryLog {
        match fs::read(&self.path) {
            Ok(bytes) => decode(&bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => HistoryLog::default(),
            Err(err) => {
                warn!("Could not read session history {}: {err}", self.path.display());
                HistoryLog::default()
            }
        }
    }

    fn save(&self, log: &HistoryLog) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec(log)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

// --- In-Memory Store ---

// Shared blob, so a test can inspect what the app saved
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    blob: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryHistoryStore {
    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: Arc::new(Mutex::new(Some(blob.into()))),
        }
    }

    pub fn blob(&self) -> Option<Vec<u8>> {
        self.blob.lock().ok().and_then(|blob| blob.clone())
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> HistoryLog {
        self.blob().map(|bytes| decode(&bytes)).unwrap_or_default()
    }

    fn save(&self, log: &HistoryLog) -> Result<(), HistoryError> {
        let data = serde_json::to_vec(log)?;
        if let Ok(mut blob) = self.blob.lock() {
            *blob = Some(data);
        }
        Ok(())
    }
}

// Resource wrapping whichever store the host picked
#[derive(Resource)]
pub struct HistoryStorage(pub Box<dyn HistoryStore>);

impl HistoryStorage {
    pub fn new(store: impl HistoryStore + 'static) -> Self {
        Self(Box::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsRecord;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn log_of(scores: &[i64]) -> HistoryLog {
        let mut log = HistoryLog::default();
        for (i, score) in scores.iter().enumerate() {
            log.push(StatsRecord {
                score: *score,
                accuracy: 80,
                reaction_ms: 250,
                created_at: Utc.timestamp_millis_opt(i as i64 * 1_000).unwrap(),
            });
        }
        log
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileHistoryStore::with_path(dir.path().join("nested").join("history.json"));
        let log = log_of(&[100, 250, 400]);
        store.save(&log).unwrap();
        assert_eq!(store.load(), log);
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let store = FileHistoryStore::with_path(dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn unreadable_path_is_empty_history() {
        // A directory exists but cannot be read as a file
        let dir = tempdir().unwrap();
        let store = FileHistoryStore::with_path(dir.path());
        assert_ne!(fs::read(store.path()).unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(FileHistoryStore::with_path(&path).load().is_empty());
    }

    #[test]
    fn memory_store_reads_legacy_blob() {
        let store = MemoryHistoryStore::with_blob(
            r#"[{"score":1200,"accuracy":91,"reaction":240,"date":1700000000000}]"#,
        );
        let log = store.load();
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().reaction_ms, 240);
    }

    #[test]
    fn oversized_stored_log_is_trimmed_on_load() {
        let scores: Vec<i64> = (0..60).collect();
        let mut oversized = Vec::new();
        for (i, score) in scores.iter().enumerate() {
            oversized.push(serde_json::json!({
                "score": score, "accuracy": 50, "reaction": 300, "date": i as i64
            }));
        }
        let store = MemoryHistoryStore::with_blob(serde_json::to_vec(&oversized).unwrap());
        let log = store.load();
        assert_eq!(log.len(), 50);
        assert_eq!(log.iter().next().unwrap().score, 10);
    }

    #[test]
    fn memory_store_save_replaces_blob() {
        let store = MemoryHistoryStore::default();
        assert!(store.load().is_empty());
        store.save(&log_of(&[7])).unwrap();
        assert_eq!(store.load().latest().unwrap().score, 7);
    }
}
