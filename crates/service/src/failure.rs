//! Fatal-failure tracking shared by the lookup service and the workers.
//!
//! The cache never stores negative results, so repeated fatal failures
//! would otherwise be invisible to operators. The failure log records them
//! per key for the coverage report, and the auth breaker short-circuits
//! all further fetches once credentials are known bad.

use chrono::{DateTime, Utc};
use docvault_core::key::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Which fatal error a key last failed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream says the library/topic does not exist.
    NotFound,
    /// Upstream rejected credentials.
    Auth,
}

/// Accumulated failures for one key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub occurrences: u32,
    pub last_seen: DateTime<Utc>,
}

/// Per-key record of fatal fetch failures.
#[derive(Default)]
pub struct FailureLog {
    inner: Mutex<HashMap<CacheKey, FailureRecord>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fatal failure, bumping the count for repeats.
    pub fn record(&self, key: &CacheKey, kind: FailureKind, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .entry(key.clone())
            .and_modify(|r| {
                r.kind = kind;
                r.occurrences += 1;
                r.last_seen = now;
            })
            .or_insert(FailureRecord {
                kind,
                occurrences: 1,
                last_seen: now,
            });
    }

    /// Forget failures for a key (e.g. after a successful fetch).
    pub fn clear(&self, key: &CacheKey) {
        self.inner.lock().unwrap().remove(key);
    }

    /// Snapshot of all recorded failures, sorted by key.
    pub fn snapshot(&self) -> Vec<(CacheKey, FailureRecord)> {
        let mut out: Vec<(CacheKey, FailureRecord)> = self
            .inner
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// Trips on the first `Auth` error and short-circuits every subsequent
/// fetch attempt until credentials are corrected and `reset` is called.
#[derive(Default)]
pub struct AuthBreaker {
    tripped: AtomicBool,
}

impl AuthBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.tripped.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_repeats() {
        let log = FailureLog::new();
        let key = CacheKey::library("ghost");
        let now = Utc::now();

        log.record(&key, FailureKind::NotFound, now);
        log.record(&key, FailureKind::NotFound, now);

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.occurrences, 2);
        assert_eq!(snapshot[0].1.kind, FailureKind::NotFound);
    }

    #[test]
    fn latest_kind_wins() {
        let log = FailureLog::new();
        let key = CacheKey::library("flaky");
        let now = Utc::now();

        log.record(&key, FailureKind::NotFound, now);
        log.record(&key, FailureKind::Auth, now);

        assert_eq!(log.snapshot()[0].1.kind, FailureKind::Auth);
    }

    #[test]
    fn clear_forgets_key() {
        let log = FailureLog::new();
        let key = CacheKey::library("ghost");
        log.record(&key, FailureKind::NotFound, Utc::now());
        log.clear(&key);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn breaker_trips_and_resets() {
        let breaker = AuthBreaker::new();
        assert!(!breaker.is_tripped());
        breaker.trip();
        assert!(breaker.is_tripped());
        breaker.reset();
        assert!(!breaker.is_tripped());
    }
}
