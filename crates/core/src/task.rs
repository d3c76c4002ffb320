//! Refresh task — a queued request to re-fetch a stale entry.

use crate::key::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending background refresh for one cache key.
///
/// At most one task per key is pending at any time; enqueue requests for a
/// key that already has a pending task are no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTask {
    /// The key to re-fetch.
    pub key: CacheKey,

    /// Lower = more important. Ties broken by enqueue time.
    pub priority: i32,

    /// When the task entered the queue.
    pub enqueued_at: DateTime<Utc>,
}

impl RefreshTask {
    pub fn new(key: CacheKey, priority: i32, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            key,
            priority,
            enqueued_at,
        }
    }
}
