//! Cache entry — one stored documentation record.

use crate::key::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much to trust the content of an entry at the moment it is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfidence {
    /// Fetched within its TTL.
    Fresh,
    /// Past its TTL, served while a background refresh is pending.
    StaleFallback,
}

/// A single cached documentation record.
///
/// Entries are replaced atomically and wholesale on refresh — never mutated
/// field by field. They are removed only by explicit invalidation; staleness
/// marks an entry for background replacement but never deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The key this entry is stored under.
    pub key: CacheKey,

    /// The full documentation text.
    pub content: String,

    /// When the content was fetched from the upstream source.
    pub fetched_at: DateTime<Utc>,

    /// Per-entry time-to-live, allowing per-library overrides.
    pub ttl_seconds: u64,

    /// Confidence tag stamped when the entry was last written.
    pub confidence: SourceConfidence,
}

impl CacheEntry {
    /// Build a fresh entry fetched at the given instant.
    pub fn fresh(
        key: CacheKey,
        content: impl Into<String>,
        fetched_at: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            key,
            content: content.into(),
            fetched_at,
            ttl_seconds,
            confidence: SourceConfidence::Fresh,
        }
    }
}
