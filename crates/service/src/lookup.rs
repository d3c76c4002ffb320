//! The lookup service — cache-first documentation resolution.
//!
//! Three states per request:
//!
//! - `MISS` — no entry: fetch synchronously (time-bounded), cache on
//!   success, degrade to an "unavailable" placeholder on failure. Fetch
//!   failures never surface as errors to the requesting agent.
//! - `HIT_FRESH` — entry within TTL: return it, no I/O.
//! - `HIT_STALE` — entry past TTL: return it immediately (degraded but
//!   non-blocking) and enqueue one background refresh.
//!
//! Failed miss fetches are NOT cached as negative results; they are
//! recorded in the failure log so the coverage report can surface
//! persistent failures.

use crate::failure::{AuthBreaker, FailureKind, FailureLog};
use crate::queue::RefreshQueue;
use crate::worker::exponential_delay;
use docvault_config::{CacheConfig, FetchConfig};
use docvault_core::clock::Clock;
use docvault_core::entry::{CacheEntry, SourceConfidence};
use docvault_core::error::FetchError;
use docvault_core::key::CacheKey;
use docvault_core::source::{DocContent, DocSource};
use docvault_core::staleness::is_stale;
use docvault_core::store::DocStore;
use docvault_core::task::RefreshTask;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which path a lookup took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    Miss,
    HitFresh,
    HitStale,
}

/// The outcome of one lookup.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Documentation text, or the unavailable placeholder.
    pub content: String,
    /// Which cache state the request hit.
    pub state: LookupState,
    /// Confidence in the returned content at serve time.
    pub confidence: SourceConfidence,
    /// False when the content is the unavailable placeholder.
    pub available: bool,
}

/// The placeholder served when documentation cannot be obtained. Clearly
/// marked so the agent pipeline can continue without mistaking it for
/// real documentation.
pub fn unavailable_placeholder(key: &CacheKey) -> String {
    format!("[documentation unavailable: {key}]")
}

/// Orchestrates store, staleness policy, and refresh queue to answer a
/// documentation request synchronously.
pub struct LookupService {
    store: Arc<dyn DocStore>,
    source: Arc<dyn DocSource>,
    clock: Arc<dyn Clock>,
    queue: Arc<RefreshQueue>,
    failures: Arc<FailureLog>,
    auth: Arc<AuthBreaker>,
    fetch: FetchConfig,
    cache: CacheConfig,
}

impl LookupService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn DocStore>,
        source: Arc<dyn DocSource>,
        clock: Arc<dyn Clock>,
        queue: Arc<RefreshQueue>,
        failures: Arc<FailureLog>,
        auth: Arc<AuthBreaker>,
        fetch: FetchConfig,
        cache: CacheConfig,
    ) -> Self {
        Self {
            store,
            source,
            clock,
            queue,
            failures,
            auth,
            fetch,
            cache,
        }
    }

    /// Resolve documentation for a key.
    ///
    /// Never returns an error: all failures degrade to the unavailable
    /// placeholder. `priority` is carried onto any refresh task enqueued
    /// for a stale hit.
    pub async fn lookup(&self, library: &str, topic: Option<&str>, priority: i32) -> LookupResult {
        let key = match topic {
            Some(t) => CacheKey::topic(library, t),
            None => CacheKey::library(library),
        };

        let entry = match self.store.get(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                // A broken store read degrades to a miss rather than an error.
                warn!(key = %key, error = %e, "Store read failed, treating as miss");
                None
            }
        };

        match entry {
            None => self.on_miss(key).await,
            Some(entry) => {
                let now = self.clock.now();
                if is_stale(&entry, now) {
                    self.on_stale_hit(entry, priority)
                } else {
                    debug!(key = %key, "Fresh cache hit");
                    LookupResult {
                        content: entry.content,
                        state: LookupState::HitFresh,
                        confidence: SourceConfidence::Fresh,
                        available: true,
                    }
                }
            }
        }
    }

    /// Reset the auth breaker after credentials are corrected.
    pub fn reset_auth(&self) {
        self.auth.reset();
    }

    async fn on_miss(&self, key: CacheKey) -> LookupResult {
        debug!(key = %key, "Cache miss, fetching synchronously");

        match self.fetch_with_retries(&key).await {
            Ok(content) => {
                let entry = CacheEntry::fresh(
                    key.clone(),
                    content.text.clone(),
                    self.clock.now(),
                    self.cache.ttl_for(&key.library),
                );
                if let Err(e) = self.store.put(entry).await {
                    // Serve the fetched content anyway; only persistence failed.
                    warn!(key = %key, error = %e, "Failed to cache fetched documentation");
                }
                self.failures.clear(&key);
                info!(key = %key, "Fetched and cached documentation");
                LookupResult {
                    content: content.text,
                    state: LookupState::Miss,
                    confidence: SourceConfidence::Fresh,
                    available: true,
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Miss-path fetch failed, serving placeholder");
                match &e {
                    FetchError::NotFound { .. } => {
                        self.failures
                            .record(&key, FailureKind::NotFound, self.clock.now());
                    }
                    FetchError::Auth(_) => {
                        self.failures.record(&key, FailureKind::Auth, self.clock.now());
                    }
                    _ => {}
                }
                LookupResult {
                    content: unavailable_placeholder(&key),
                    state: LookupState::Miss,
                    confidence: SourceConfidence::StaleFallback,
                    available: false,
                }
            }
        }
    }

    fn on_stale_hit(&self, entry: CacheEntry, priority: i32) -> LookupResult {
        let key = entry.key.clone();
        let enqueued = self
            .queue
            .enqueue(RefreshTask::new(key.clone(), priority, self.clock.now()));
        debug!(key = %key, enqueued, "Stale cache hit, serving fallback content");

        LookupResult {
            content: entry.content,
            state: LookupState::HitStale,
            confidence: SourceConfidence::StaleFallback,
            available: true,
        }
    }

    /// Time-bounded fetch with limited transient retries.
    ///
    /// `NotFound` and `Auth` fail immediately; `Auth` also trips the
    /// breaker so subsequent misses short-circuit without touching the
    /// network.
    async fn fetch_with_retries(&self, key: &CacheKey) -> Result<DocContent, FetchError> {
        let timeout = Duration::from_secs(self.fetch.timeout_secs);
        let mut attempt: u32 = 0;

        loop {
            if self.auth.is_tripped() {
                return Err(FetchError::Auth(
                    "Authentication previously failed; fetches suspended".into(),
                ));
            }

            let outcome = tokio::time::timeout(
                timeout,
                self.source.fetch(&key.library, key.topic.as_deref()),
            )
            .await;

            let err = match outcome {
                Ok(Ok(content)) => return Ok(content),
                Ok(Err(e)) => e,
                Err(_) => FetchError::Network(format!(
                    "Fetch timed out after {}s",
                    self.fetch.timeout_secs
                )),
            };

            if let FetchError::Auth(_) = &err {
                self.auth.trip();
                return Err(err);
            }
            if !err.is_transient() {
                return Err(err);
            }

            attempt += 1;
            if attempt > self.fetch.miss_retries {
                return Err(err);
            }

            let delay = exponential_delay(attempt, self.fetch.retry_base_ms, timeout);
            warn!(
                key = %key,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient fetch failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
