//! Optional snapshot persistence.
//!
//! A convenience only: a saved snapshot lets a restarted process serve the
//! catalog before its first fetch completes. Nothing relies on it being
//! present or current.

use crate::core::movie::MovieRecord;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Catalog snapshot as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Wall-clock time of the fetch that produced `movies`
    pub fetched_at: DateTime<Utc>,
    pub movies: Vec<MovieRecord>,
}

/// Key-value style store for a single catalog snapshot
pub trait SnapshotStore: Send + Sync {
    /// Load the saved snapshot, if any
    fn load(&self) -> Result<Option<StoredSnapshot>>;

    /// Replace the saved snapshot
    fn save(&self, snapshot: &StoredSnapshot) -> Result<()>;

    /// Forget the saved snapshot
    fn clear(&self) -> Result<()>;
}

/// Snapshot kept as a JSON document on disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoredSnapshot>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, snapshot: &StoredSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename keeps the previous document intact on failure.
        // Each save gets its own temporary file so concurrent saves never
        // write into the same one.
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        let written = std::fs::write(&tmp, serde_json::to_vec(snapshot)?)
            .and_then(|()| std::fs::rename(&tmp, &self.path));
        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        Ok(written?)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-memory store (for testing)
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<StoredSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: StoredSnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<StoredSnapshot>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, snapshot: &StoredSnapshot) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::source::fallback_dataset;

    #[test]
    fn test_json_file_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("catalog.json"));
        assert_eq!(store.load().unwrap(), None);

        let snapshot = StoredSnapshot {
            fetched_at: Utc::now(),
            movies: fallback_dataset(),
        };
        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.fetched_at, snapshot.fetched_at);
        let titles: Vec<_> = loaded.movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(
            titles,
            ["The Shawshank Redemption", "The Godfather", "The Dark Knight"]
        );

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_concurrent_saves_leave_one_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(dir.path().join("catalog.json")));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut movies = fallback_dataset();
                    movies.truncate(1 + n % 3);
                    store
                        .save(&StoredSnapshot {
                            fetched_at: Utc::now(),
                            movies,
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load().unwrap().unwrap();
        assert!((1..=3).contains(&loaded.movies.len()));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_corrupt_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(Error::Format(_))));
    }
}
