//! crates/lesson_core/src/history.rs
//!
//! Per-user history of generated bundles, newest first, capped at
//! `MAX_HISTORY_ENTRIES`. Persisted entries never carry slide images.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ContentBundle;
use crate::ports::{KeyValueStore, PortError, PortResult};

pub const MAX_HISTORY_ENTRIES: usize = 10;

pub fn history_key(user_id: &str) -> String {
    format!("history_{}", user_id)
}

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads a user's history. Missing or unreadable data is an empty history.
    pub fn load(&self, user_id: &str) -> Vec<ContentBundle> {
        let raw = match self.store.get(&history_key(user_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(user_id, "Could not read history: {}", e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(user_id, "Stored history is unreadable, treating as empty: {}", e);
            Vec::new()
        })
    }

    /// Prepends `bundle` to the stored history and persists it.
    ///
    /// Returns the entries that ended up in storage. When the store is full
    /// the oldest entries are dropped one at a time until the write fits; if
    /// even a single entry does not fit, the user's history is removed.
    pub fn append(&self, user_id: &str, bundle: &ContentBundle) -> PortResult<Vec<ContentBundle>> {
        let mut entries = self.load(user_id);
        entries.retain(|existing| existing.id != bundle.id);
        entries.insert(0, bundle.clone());
        self.save(user_id, entries)
    }

    pub fn clear(&self, user_id: &str) -> PortResult<()> {
        self.store.remove(&history_key(user_id))
    }

    fn save(&self, user_id: &str, entries: Vec<ContentBundle>) -> PortResult<Vec<ContentBundle>> {
        let key = history_key(user_id);
        let mut entries: Vec<ContentBundle> = entries
            .iter()
            .take(MAX_HISTORY_ENTRIES)
            .map(ContentBundle::without_images)
            .collect();

        loop {
            let json = serde_json::to_string(&entries)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            match self.store.set(&key, &json) {
                Ok(()) => {
                    debug!(user_id, entries = entries.len(), "History saved");
                    return Ok(entries);
                }
                Err(PortError::StorageFull) if entries.len() > 1 => {
                    entries.pop();
                    warn!(user_id, entries = entries.len(), "Storage full, shortening history");
                }
                Err(PortError::StorageFull) => {
                    warn!(user_id, "Storage full, clearing history");
                    self.store.remove(&key)?;
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            }
        }
    }
}
