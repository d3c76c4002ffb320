//! Engine — wires the whole pipeline from an `AppConfig`.
//!
//! Owns the refresh queue, the worker pool, and the shared failure state,
//! and exposes the agent-facing [`DocService`] plus the operational
//! coverage report. The store, source, and clock are injected so callers
//! pick backends and tests pin time.

use crate::docs::{DocRequest, DocService};
use crate::failure::{AuthBreaker, FailureLog};
use crate::lookup::LookupService;
use crate::queue::RefreshQueue;
use crate::report::{coverage_report, CoverageReport};
use crate::worker::RefreshWorkerPool;
use docvault_config::AppConfig;
use docvault_context::{BudgetAllocator, ContextBuilder};
use docvault_core::clock::Clock;
use docvault_core::error::StoreError;
use docvault_core::source::DocSource;
use docvault_core::store::DocStore;
use std::sync::Arc;
use std::time::Duration;

/// The assembled documentation engine.
pub struct DocEngine {
    docs: DocService,
    lookup: Arc<LookupService>,
    store: Arc<dyn DocStore>,
    clock: Arc<dyn Clock>,
    queue: Arc<RefreshQueue>,
    failures: Arc<FailureLog>,
    pool: RefreshWorkerPool,
}

impl DocEngine {
    /// Wire queue, workers, lookup, budgets, and context assembly from
    /// configuration.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn DocStore>,
        source: Arc<dyn DocSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = Arc::new(RefreshQueue::new(config.refresh.queue_depth));
        let failures = Arc::new(FailureLog::new());
        let auth = Arc::new(AuthBreaker::new());

        let lookup = Arc::new(LookupService::new(
            store.clone(),
            source.clone(),
            clock.clone(),
            queue.clone(),
            failures.clone(),
            auth.clone(),
            config.fetch.clone(),
            config.cache.clone(),
        ));

        let pool = RefreshWorkerPool::start(
            queue.clone(),
            store.clone(),
            source,
            clock.clone(),
            failures.clone(),
            auth,
            config.refresh.clone(),
            config.cache.clone(),
            Duration::from_secs(config.fetch.timeout_secs),
        );

        let mut builder = ContextBuilder::new().with_marker(config.context.truncation_marker.clone());
        for (category, template) in &config.context.summaries {
            builder = builder.with_summary(category.clone(), template.clone());
        }

        let allocator = BudgetAllocator::new(
            config.budget.per_agent_caps.clone(),
            config.budget.default_cap,
        );

        let docs = DocService::new(lookup.clone(), allocator, builder);

        Self {
            docs,
            lookup,
            store,
            clock,
            queue,
            failures,
            pool,
        }
    }

    /// The agent-facing documentation call.
    pub async fn request_docs(&self, agent_id: &str, requests: &[DocRequest]) -> String {
        self.docs.request_docs(agent_id, requests).await
    }

    /// Direct access to the lookup service.
    pub fn lookup(&self) -> &Arc<LookupService> {
        &self.lookup
    }

    /// Coverage of the required libraries against the cache.
    pub async fn coverage_report(
        &self,
        required: &[String],
    ) -> Result<CoverageReport, StoreError> {
        coverage_report(
            self.store.as_ref(),
            self.clock.as_ref(),
            &self.failures,
            required,
        )
        .await
    }

    /// Pending background refreshes.
    pub fn pending_refreshes(&self) -> usize {
        self.queue.len()
    }

    /// Stop the worker pool. In-flight refreshes are abandoned without
    /// data loss.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}
