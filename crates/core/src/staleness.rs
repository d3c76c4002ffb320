//! Staleness policy — pure freshness decisions.
//!
//! No side effects, no I/O, no wall-clock reads. The caller supplies `now`
//! from an injected [`Clock`](crate::clock::Clock).

use crate::entry::CacheEntry;
use chrono::{DateTime, Utc};

/// Whether an entry has outlived its TTL at the given instant.
///
/// Defined as `now - entry.fetched_at >= entry.ttl_seconds`.
pub fn is_stale(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    entry_age(entry, now) >= entry.ttl_seconds as i64
}

/// Age of an entry in whole seconds. Negative if `fetched_at` is in the
/// future (clock skew); such entries are never stale.
pub fn entry_age(entry: &CacheEntry, now: DateTime<Utc>) -> i64 {
    (now - entry.fetched_at).num_seconds()
}
