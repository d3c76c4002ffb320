//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use docvault_core::entry::CacheEntry;
use docvault_core::error::StoreError;
use docvault_core::key::CacheKey;
use docvault_core::store::DocStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store keyed by `CacheKey`.
///
/// Entries are cloned in and out whole, so concurrent readers never see a
/// partially written entry.
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
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
