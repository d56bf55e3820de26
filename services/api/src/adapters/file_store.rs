//! services/api/src/adapters/file_store.rs
//!
//! A `KeyValueStore` persisted as one JSON object on disk, capped at a byte
//! quota the way browser local storage is.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lesson_core::ports::{KeyValueStore, PortError, PortResult};
use tracing::{info, warn};

/// The whole map is held in memory and rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    quota_bytes: usize,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or starts) the store at `path`. An unreadable file is set aside
    /// and replaced by an empty store.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: usize) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    let backup = path.with_extension("corrupt");
                    warn!("Storage file {} is unreadable ({}), moving it to {}", path.display(), e, backup.display());
                    std::fs::rename(&path, &backup)?;
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };

        info!(path = %path.display(), keys = entries.len(), "Opened storage file");
        Ok(Self {
            path,
            quota_bytes,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| PortError::Unexpected(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| PortError::Unexpected(format!("rename {}: {}", self.path.display(), e)))
    }
}

fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

fn poisoned() -> PortError {
    PortError::Unexpected("file store lock poisoned".to_string())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        let current = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
        if used_bytes(&entries) - current + key.len() + value.len() > self.quota_bytes {
            return Err(PortError::StorageFull);
        }

        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
