//! Snapshot Module
//!
//! Serialized form of the cache contents and the durable stores that hold it.
//! The blob is a JSON object `{ "<key>": { "data": ..., "timestamp": ms } }`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Snapshot Entry ==
/// One exported entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// The cached payload
    pub data: Value,
    /// When the payload was fetched (Unix milliseconds)
    pub timestamp: i64,
}

// == Snapshot ==
/// Full key to entry map, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CacheError::Persistence(e.to_string()))
    }

    /// Parses a snapshot, rejecting anything that is not the expected shape.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::Persistence(e.to_string()))
    }
}

// == Snapshot Store ==
/// Durable key-value store that holds serialized snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Reads the blob saved under `storage_key`, `None` if nothing was saved.
    fn load(&self, storage_key: &str) -> Result<Option<String>>;

    /// Replaces the blob saved under `storage_key`.
    fn save(&self, storage_key: &str, contents: &str) -> Result<()>;
}

// == File Snapshot Store ==
/// Stores each snapshot as `<dir>/<storage_key>.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Uses the platform cache directory (`~/.cache/request_cache/` on Linux).
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "request_cache")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, storage_key: &str) -> Result<PathBuf> {
        let valid = !storage_key.is_empty()
            && storage_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !storage_key.starts_with('.');
        if !valid {
            return Err(CacheError::Persistence(format!(
                "invalid storage key '{}'",
                storage_key
            )));
        }
        Ok(self.dir.join(format!("{}.json", storage_key)))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, storage_key: &str) -> Result<Option<String>> {
        let path = self.path_for(storage_key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Persistence(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, storage_key: &str, contents: &str) -> Result<()> {
        let path = self.path_for(storage_key)?;
        let io_err = |e: std::io::Error| {
            CacheError::Persistence(format!("failed to write {}: {}", path.display(), e))
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Write then rename so readers never observe a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }
}
