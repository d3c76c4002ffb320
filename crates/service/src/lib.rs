//! Lookup orchestration and background refresh — the heart of docvault.
//!
//! A documentation request flows through three stages:
//!
//! 1. **Lookup** — [`LookupService`] answers from the cache, fetching
//!    synchronously only on a miss and enqueuing a background refresh on a
//!    stale hit (agents are never blocked waiting for data they already
//!    have, only for data they have never seen)
//! 2. **Budget** — the agent's token cap is resolved and the returned
//!    documents are fitted to it by the context builder
//! 3. **Refresh** — [`RefreshWorkerPool`] drains the deduplicating
//!    [`RefreshQueue`] in the background and atomically replaces entries
//!
//! [`DocEngine`] wires the whole pipeline from an `AppConfig`.

pub mod docs;
pub mod engine;
pub mod failure;
pub mod lookup;
pub mod queue;
pub mod report;
pub mod worker;

pub use docs::{DocRequest, DocService};
pub use engine::DocEngine;
pub use failure::{AuthBreaker, FailureKind, FailureLog, FailureRecord};
pub use lookup::{unavailable_placeholder, LookupResult, LookupService, LookupState};
pub use queue::RefreshQueue;
pub use report::{coverage_report, CoverageReport, FailureEntry, StaleEntry};
pub use worker::{exponential_delay, RefreshWorkerPool};
