//! File-based store — persistent JSON-lines storage.
//!
//! Each line of the backing file is one JSON-encoded `CacheEntry`. Entries
//! are loaded into memory on open and the whole file is rewritten on every
//! mutation, so a write is either fully applied or not applied at all.
//! Simple, portable, and human-inspectable.

use async_trait::async_trait;
use docvault_core::entry::CacheEntry;
use docvault_core::error::StoreError;
use docvault_core::key::CacheKey;
use docvault_core::store::DocStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed store using JSONL (one JSON object per line).
pub struct FileStore {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl FileStore {
    /// Open a file-backed store at the given path.
    ///
    /// If the file exists, entries are loaded from it; corrupted lines are
    /// skipped with a warning. If it does not exist, the store starts empty
    /// and the file is created on first write.
    pub fn open(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File doc store loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    fn load_from_disk(path: &PathBuf) -> HashMap<CacheKey, CacheEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(), // File doesn't exist yet — start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<CacheEntry>(line) {
                Ok(entry) => Some((entry.key.clone(), entry)),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted cache entry");
                    None
                }
            })
            .collect()
    }

    /// Rewrite the backing file from the in-memory map.
    async fn flush(&self) -> Result<(), StoreError> {
        let entries = self.entries.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("Failed to create cache directory: {e}")))?;
        }

        let mut content = String::new();
        let mut sorted: Vec<&CacheEntry> = entries.values().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));
        for entry in sorted {
            let line = serde_json::to_string(entry)
                .map_err(|e| StoreError::Storage(format!("Failed to serialize cache entry: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Storage(format!("Failed to write cache file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl DocStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries.write().await.insert(entry.key.clone(), entry);
        self.flush().await
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.flush().await?;
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let mut entries: Vec<CacheEntry> = self.entries.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }
}
