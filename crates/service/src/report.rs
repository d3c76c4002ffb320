//! Validation/coverage report for operational tooling.
//!
//! Given the list of libraries a workflow requires, reports what is
//! missing, what is cached but stale, and what has persistently failed —
//! so operators can tell "never available" apart from "temporarily
//! outdated".

use crate::failure::{FailureKind, FailureLog};
use docvault_core::clock::Clock;
use docvault_core::error::StoreError;
use docvault_core::staleness::{entry_age, is_stale};
use docvault_core::store::DocStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cached entry past its TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleEntry {
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub age_seconds: i64,
}

/// A key with recorded fatal fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub kind: FailureKind,
    pub occurrences: u32,
}

/// Coverage of a required-library list against the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Required libraries with no cached entry under any topic.
    pub missing: Vec<String>,
    /// All cached entries currently past their TTL.
    pub stale: Vec<StaleEntry>,
    /// Keys with persistent fatal failures (NotFound/Auth).
    pub unavailable: Vec<FailureEntry>,
    /// Percentage of required libraries with at least one cached entry.
    pub coverage_percent: f32,
}

/// Build a coverage report from the store's enumeration, the staleness
/// policy, and the failure log.
pub async fn coverage_report(
    store: &dyn DocStore,
    clock: &dyn Clock,
    failures: &FailureLog,
    required: &[String],
) -> Result<CoverageReport, StoreError> {
    let entries = store.list().await?;
    let now = clock.now();

    let cached_libraries: HashSet<&str> =
        entries.iter().map(|e| e.key.library.as_str()).collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|lib| !cached_libraries.contains(lib.as_str()))
        .cloned()
        .collect();

    let stale: Vec<StaleEntry> = entries
        .iter()
        .filter(|e| is_stale(e, now))
        .map(|e| StaleEntry {
            library: e.key.library.clone(),
            topic: e.key.topic.clone(),
            age_seconds: entry_age(e, now),
        })
        .collect();

    let unavailable: Vec<FailureEntry> = failures
        .snapshot()
        .into_iter()
        .map(|(key, record)| FailureEntry {
            library: key.library,
            topic: key.topic,
            kind: record.kind,
            occurrences: record.occurrences,
        })
        .collect();

    let coverage_percent = if required.is_empty() {
        100.0
    } else {
        let covered = required.len() - missing.len();
        (covered as f32 / required.len() as f32) * 100.0
    };

    Ok(CoverageReport {
        missing,
        stale,
        unavailable,
        coverage_percent,
    })
}
