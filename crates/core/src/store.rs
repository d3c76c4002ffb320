//! DocStore trait — durable key→entry storage.
//!
//! The store is the only resource mutated by more than one actor (the
//! lookup miss path and the refresh workers). All mutations are whole-entry
//! atomic replacements: readers never observe a partially written entry.

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::key::CacheKey;
use async_trait::async_trait;

/// Durable key-value storage for documentation entries.
///
/// Implementations: SQLite, JSONL file, in-memory (for testing).
#[async_trait]
pub trait DocStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "memory").
    fn name(&self) -> &str;

    /// Look up the entry for a key, if any.
    async fn get(&self, key: &CacheKey) -> std::result::Result<Option<CacheEntry>, StoreError>;

    /// Insert or atomically replace the entry for `entry.key`.
    ///
    /// `get` after a completed `put` for the same key, even across process
    /// restarts for durable backends, returns the stored value unchanged.
    async fn put(&self, entry: CacheEntry) -> std::result::Result<(), StoreError>;

    /// Remove the entry for a key. Returns whether an entry existed.
    async fn invalidate(&self, key: &CacheKey) -> std::result::Result<bool, StoreError>;

    /// Enumerate all stored entries, for validation/coverage tooling.
    async fn list(&self) -> std::result::Result<Vec<CacheEntry>, StoreError>;

    /// Total number of stored entries.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}
