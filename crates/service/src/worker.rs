//! Background refresh worker pool.
//!
//! N concurrent workers drain the refresh queue: dequeue → fetch → atomic
//! `put` with a re-stamped `fetched_at`. Transient failures back off
//! exponentially up to a bounded attempt count; after the cap the task is
//! dropped and the last-known-good (stale) entry stays in place. Fetch
//! errors never crash the pool, and workers never touch the lookup
//! service's synchronous fast path.

use crate::failure::{AuthBreaker, FailureKind, FailureLog};
use crate::queue::RefreshQueue;
use docvault_config::{CacheConfig, RefreshConfig};
use docvault_core::clock::Clock;
use docvault_core::entry::CacheEntry;
use docvault_core::error::FetchError;
use docvault_core::source::DocSource;
use docvault_core::store::DocStore;
use docvault_core::task::RefreshTask;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Exponential backoff delay for the given 1-based attempt number,
/// saturating at `cap`.
pub fn exponential_delay(attempt: u32, base_ms: u64, cap: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let ms = base_ms.saturating_mul(1u64 << exp);
    Duration::from_millis(ms).min(cap)
}

/// Everything a worker needs, shared across the pool.
struct WorkerContext {
    queue: Arc<RefreshQueue>,
    store: Arc<dyn DocStore>,
    source: Arc<dyn DocSource>,
    clock: Arc<dyn Clock>,
    failures: Arc<FailureLog>,
    auth: Arc<AuthBreaker>,
    refresh: RefreshConfig,
    cache: CacheConfig,
    fetch_timeout: Duration,
}

/// A bounded pool of background refresh workers.
pub struct RefreshWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl RefreshWorkerPool {
    /// Spawn `refresh.workers` workers draining `queue`.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        queue: Arc<RefreshQueue>,
        store: Arc<dyn DocStore>,
        source: Arc<dyn DocSource>,
        clock: Arc<dyn Clock>,
        failures: Arc<FailureLog>,
        auth: Arc<AuthBreaker>,
        refresh: RefreshConfig,
        cache: CacheConfig,
        fetch_timeout: Duration,
    ) -> Self {
        let workers = refresh.workers.max(1);
        let ctx = Arc::new(WorkerContext {
            queue,
            store,
            source,
            clock,
            failures,
            auth,
            refresh,
            cache,
            fetch_timeout,
        });

        let handles = (0..workers)
            .map(|id| {
                let ctx = ctx.clone();
                tokio::spawn(worker_loop(id, ctx))
            })
            .collect();

        info!(workers, "Refresh worker pool started");
        Self { handles }
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Abort all workers. In-flight refreshes are abandoned without data
    /// loss: the stale entry they were replacing remains valid.
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        debug!("Refresh worker pool shut down");
    }
}

async fn worker_loop(id: usize, ctx: Arc<WorkerContext>) {
    debug!(worker = id, "Refresh worker started");
    loop {
        let task = ctx.queue.next().await;
        refresh_entry(id, &ctx, task).await;
    }
}

/// Process one refresh task to completion: success, fatal error, or
/// retry-cap exhaustion. Never returns an error — the pool must survive
/// anything the source throws at it.
async fn refresh_entry(worker: usize, ctx: &WorkerContext, task: RefreshTask) {
    let key = task.key;

    for attempt in 1..=ctx.refresh.max_attempts {
        if ctx.auth.is_tripped() {
            debug!(worker, key = %key, "Auth breaker tripped, dropping refresh task");
            return;
        }

        let outcome = tokio::time::timeout(
            ctx.fetch_timeout,
            ctx.source.fetch(&key.library, key.topic.as_deref()),
        )
        .await;

        let err = match outcome {
            Ok(Ok(content)) => {
                let entry = CacheEntry::fresh(
                    key.clone(),
                    content.text,
                    ctx.clock.now(),
                    ctx.cache.ttl_for(&key.library),
                );
                match ctx.store.put(entry).await {
                    Ok(()) => {
                        ctx.failures.clear(&key);
                        info!(worker, key = %key, "Refreshed documentation");
                    }
                    Err(e) => {
                        warn!(worker, key = %key, error = %e, "Refresh fetched but store write failed");
                    }
                }
                return;
            }
            Ok(Err(e)) => e,
            Err(_) => FetchError::Network(format!(
                "Refresh fetch timed out after {}s",
                ctx.fetch_timeout.as_secs()
            )),
        };

        match &err {
            FetchError::Auth(_) => {
                ctx.auth.trip();
                ctx.failures.record(&key, FailureKind::Auth, ctx.clock.now());
                warn!(worker, key = %key, error = %err, "Auth failure during refresh, suspending fetches");
                return;
            }
            FetchError::NotFound { .. } => {
                ctx.failures
                    .record(&key, FailureKind::NotFound, ctx.clock.now());
                warn!(worker, key = %key, "Documentation gone upstream, dropping refresh task");
                return;
            }
            _ => {}
        }

        if attempt == ctx.refresh.max_attempts {
            warn!(
                worker,
                key = %key,
                attempts = attempt,
                "Refresh abandoned after retry cap, keeping stale entry"
            );
            return;
        }

        let mut delay = exponential_delay(
            attempt,
            ctx.refresh.backoff_base_ms,
            Duration::from_secs(ctx.refresh.backoff_cap_secs),
        );
        if let FetchError::RateLimited { retry_after_secs } = &err {
            delay = delay
                .max(Duration::from_secs(*retry_after_secs))
                .min(Duration::from_secs(ctx.refresh.backoff_cap_secs));
        }

        debug!(
            worker,
            key = %key,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Refresh attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use docvault_core::clock::ManualClock;
    use docvault_core::key::CacheKey;
    use docvault_core::source::DocContent;
    use docvault_store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockSource {
        responses: Mutex<Vec<Result<DocContent, FetchError>>>,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn new(responses: Vec<Result<DocContent, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        async fn fetch(
            &self,
            _library: &str,
            _topic: Option<&str>,
        ) -> Result<DocContent, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            }
        }
    }

    struct Fixture {
        queue: Arc<RefreshQueue>,
        store: Arc<InMemoryStore>,
        failures: Arc<FailureLog>,
        auth: Arc<AuthBreaker>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        Fixture {
            queue: Arc::new(RefreshQueue::new(16)),
            store: Arc::new(InMemoryStore::new()),
            failures: Arc::new(FailureLog::new()),
            auth: Arc::new(AuthBreaker::new()),
            clock: Arc::new(ManualClock::new(Utc::now())),
        }
    }

    fn fast_refresh(max_attempts: u32) -> RefreshConfig {
        RefreshConfig {
            workers: 1,
            max_attempts,
            backoff_base_ms: 1,
            backoff_cap_secs: 1,
            queue_depth: 16,
        }
    }

    fn start_pool(fx: &Fixture, source: Arc<dyn DocSource>, max_attempts: u32) -> RefreshWorkerPool {
        RefreshWorkerPool::start(
            fx.queue.clone(),
            fx.store.clone(),
            source,
            fx.clock.clone(),
            fx.failures.clone(),
            fx.auth.clone(),
            fast_refresh(max_attempts),
            CacheConfig::default(),
            Duration::from_secs(1),
        )
    }

    async fn wait_until<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    fn stale_entry(key: CacheKey, clock: &ManualClock) -> CacheEntry {
        CacheEntry::fresh(
            key,
            "stale content",
            clock.now() - chrono::Duration::days(30),
            3600,
        )
    }

    #[tokio::test]
    async fn successful_refresh_replaces_entry() {
        let fx = fixture();
        let key = CacheKey::topic("tokio", "sync");
        fx.store
            .put(stale_entry(key.clone(), &fx.clock))
            .await
            .unwrap();

        let source = Arc::new(MockSource::new(vec![Ok(DocContent::new("fresh content"))]));
        let pool = start_pool(&fx, source, 3);

        fx.queue
            .enqueue(RefreshTask::new(key.clone(), 1, fx.clock.now()));

        let store = fx.store.clone();
        let lookup_key = key.clone();
        wait_until(|| {
            let store = store.clone();
            let key = lookup_key.clone();
            async move { store.get(&key).await.unwrap().unwrap().content == "fresh content" }
        })
        .await;

        let entry = fx.store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.fetched_at, fx.clock.now(), "fetched_at re-stamped");
        pool.shutdown();
    }

    #[tokio::test]
    async fn retry_cap_exhaustion_keeps_stale_entry() {
        let fx = fixture();
        let key = CacheKey::library("tokio");
        fx.store
            .put(stale_entry(key.clone(), &fx.clock))
            .await
            .unwrap();

        let source = Arc::new(MockSource::new(vec![Err(FetchError::Network(
            "still down".into(),
        ))]));
        let pool = start_pool(&fx, source.clone(), 2);

        fx.queue
            .enqueue(RefreshTask::new(key.clone(), 1, fx.clock.now()));

        let src = source.clone();
        wait_until(|| {
            let src = src.clone();
            async move { src.calls() >= 2 }
        })
        .await;
        // Give the worker a moment to finish dropping the task
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(source.calls(), 2, "bounded attempts");
        let entry = fx.store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.content, "stale content", "stale entry left in place");
        assert!(fx.queue.is_empty(), "task dropped, not rescheduled forever");
        pool.shutdown();
    }

    #[tokio::test]
    async fn pool_survives_failures_and_processes_next_task() {
        let fx = fixture();
        let bad = CacheKey::library("ghost");
        let good = CacheKey::library("tokio");
        fx.store
            .put(stale_entry(good.clone(), &fx.clock))
            .await
            .unwrap();

        let source = Arc::new(MockSource::new(vec![
            Err(FetchError::NotFound {
                library: "ghost".into(),
                topic: None,
            }),
            Ok(DocContent::new("recovered")),
        ]));
        let pool = start_pool(&fx, source, 3);

        // Priority 1 first: the fatal NotFound, then the good key
        fx.queue.enqueue(RefreshTask::new(bad, 1, fx.clock.now()));
        fx.queue.enqueue(RefreshTask::new(good.clone(), 2, fx.clock.now()));

        let store = fx.store.clone();
        let key = good.clone();
        wait_until(|| {
            let store = store.clone();
            let key = key.clone();
            async move { store.get(&key).await.unwrap().unwrap().content == "recovered" }
        })
        .await;

        assert_eq!(fx.failures.snapshot().len(), 1, "NotFound recorded");
        pool.shutdown();
    }

    #[tokio::test]
    async fn auth_failure_trips_breaker_and_drops_task() {
        let fx = fixture();
        let key = CacheKey::library("tokio");
        fx.store
            .put(stale_entry(key.clone(), &fx.clock))
            .await
            .unwrap();

        let source = Arc::new(MockSource::new(vec![Err(FetchError::Auth(
            "revoked".into(),
        ))]));
        let pool = start_pool(&fx, source.clone(), 5);

        fx.queue
            .enqueue(RefreshTask::new(key.clone(), 1, fx.clock.now()));

        let auth = fx.auth.clone();
        wait_until(|| {
            let auth = auth.clone();
            async move { auth.is_tripped() }
        })
        .await;

        assert_eq!(source.calls(), 1, "Auth is never retried");
        assert_eq!(
            fx.store.get(&key).await.unwrap().unwrap().content,
            "stale content"
        );
        pool.shutdown();
    }

    #[tokio::test]
    async fn shutdown_stops_draining() {
        let fx = fixture();
        let source = Arc::new(MockSource::new(vec![Ok(DocContent::new("unused"))]));
        let pool = start_pool(&fx, source, 3);
        assert_eq!(pool.worker_count(), 1);
        pool.shutdown();

        // Let aborts land before enqueuing
        tokio::time::sleep(Duration::from_millis(20)).await;
        fx.queue
            .enqueue(RefreshTask::new(CacheKey::library("tokio"), 1, fx.clock.now()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(fx.queue.len(), 1, "nothing drains after shutdown");
    }

    #[test]
    fn backoff_grows_and_saturates() {
        let cap = Duration::from_secs(60);
        assert_eq!(exponential_delay(1, 500, cap), Duration::from_millis(500));
        assert_eq!(exponential_delay(2, 500, cap), Duration::from_millis(1000));
        assert_eq!(exponential_delay(3, 500, cap), Duration::from_millis(2000));
        assert_eq!(exponential_delay(20, 500, cap), cap);
    }
}
