//! Configuration loading, validation, and management for docvault.
//!
//! Loads configuration from `docvault.toml` (path overridable via the
//! `DOCVAULT_CONFIG` environment variable) with environment variable
//! overrides for deployment-sensitive values. Validates all settings at
//! startup. Retry counts, backoff shape, and queue depth are configuration,
//! not hardcoded constants.

use docvault_core::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// The root configuration structure.
///
/// Maps directly to `docvault.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Cache storage configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Synchronous (miss-path) fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Background refresh configuration.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Per-agent token budgets.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Context assembly configuration.
    #[serde(default)]
    pub context: ContextConfig,

    /// Upstream documentation source configuration.
    #[serde(default)]
    pub source: SourceConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("cache", &self.cache)
            .field("fetch", &self.fetch)
            .field("refresh", &self.refresh)
            .field("budget", &self.budget)
            .field("context", &self.context)
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Storage backend: "sqlite", "file", or "memory".
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Path to the backing file/database (sqlite and file backends).
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// TTL applied to entries whose library has no override.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    /// Per-library TTL overrides, keyed by library name.
    #[serde(default)]
    pub ttl_overrides: HashMap<String, u64>,
}

fn default_cache_backend() -> String {
    "sqlite".into()
}
fn default_cache_path() -> String {
    ".docvault/cache.db".into()
}
fn default_ttl_seconds() -> u64 {
    604_800 // 7 days
}

impl CacheConfig {
    /// Resolve the TTL for a library, falling back to the default.
    pub fn ttl_for(&self, library: &str) -> u64 {
        self.ttl_overrides
            .get(library)
            .copied()
            .unwrap_or(self.default_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: default_cache_path(),
            default_ttl_seconds: default_ttl_seconds(),
            ttl_overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Hard timeout on a synchronous miss-path fetch.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Transient-error retries on the miss path before giving up.
    #[serde(default = "default_miss_retries")]
    pub miss_retries: u32,

    /// Base delay for miss-path retry backoff.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_miss_retries() -> u32 {
    2
}
fn default_retry_base_ms() -> u64 {
    250
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            miss_retries: default_miss_retries(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Number of concurrent refresh workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fetch attempts per task before the task is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single backoff delay.
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// Maximum number of pending tasks; enqueues beyond this are rejected.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_workers() -> usize {
    2
}
fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_cap_secs() -> u64 {
    60
}
fn default_queue_depth() -> usize {
    256
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_secs: default_backoff_cap_secs(),
            queue_depth: default_queue_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Cap applied when an agent has no specific entry.
    #[serde(default = "default_cap")]
    pub default_cap: usize,

    /// Per-agent token caps, keyed by agent id.
    #[serde(default)]
    pub per_agent_caps: HashMap<String, usize>,
}

fn default_cap() -> usize {
    4096
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            default_cap: default_cap(),
            per_agent_caps: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Marker appended when an artifact is cut to fit the budget.
    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,

    /// Summary templates substituted for oversized artifacts, keyed by
    /// artifact category.
    #[serde(default)]
    pub summaries: HashMap<String, String>,
}

fn default_truncation_marker() -> String {
    "[truncated]".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            truncation_marker: default_truncation_marker(),
            summaries: HashMap::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the documentation API.
    #[serde(default = "default_docs_url")]
    pub docs_url: String,

    /// API key for the documentation source, if it requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_docs_url() -> String {
    "https://docs.example.com/api".into()
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("docs_url", &self.docs_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            docs_url: default_docs_url(),
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// Resolution order: `DOCVAULT_CONFIG` env var, then `docvault.toml` in
    /// the working directory, then built-in defaults.
    pub fn load() -> Result<Self, Error> {
        let path = std::env::var("DOCVAULT_CONFIG").unwrap_or_else(|_| "docvault.toml".into());
        Self::load_from(Path::new(&path))
    }

    /// Load configuration from an explicit path, applying env overrides and
    /// validating. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            })?;
            toml::from_str(&raw).map_err(|e| Error::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            })?
        } else {
            debug!(path = %path.display(), "No config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides for deployment-sensitive values.
    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("DOCVAULT_CACHE_BACKEND") {
            self.cache.backend = backend;
        }
        if let Ok(path) = std::env::var("DOCVAULT_CACHE_PATH") {
            self.cache.path = path;
        }
        if let Ok(url) = std::env::var("DOCVAULT_DOCS_URL") {
            self.source.docs_url = url;
        }
        if let Ok(key) = std::env::var("DOCVAULT_API_KEY") {
            self.source.api_key = Some(key);
        }
    }

    /// Validate settings; called automatically by the load functions.
    pub fn validate(&self) -> Result<(), Error> {
        match self.cache.backend.as_str() {
            "sqlite" | "file" | "memory" => {}
            other => {
                return Err(Error::Config {
                    message: format!(
                        "Unknown cache backend '{other}' (expected sqlite, file, or memory)"
                    ),
                });
            }
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config {
                message: "fetch.timeout_secs must be at least 1".into(),
            });
        }
        if self.refresh.workers == 0 {
            return Err(Error::Config {
                message: "refresh.workers must be at least 1".into(),
            });
        }
        if self.refresh.max_attempts == 0 {
            return Err(Error::Config {
                message: "refresh.max_attempts must be at least 1".into(),
            });
        }
        if self.refresh.queue_depth == 0 {
            return Err(Error::Config {
                message: "refresh.queue_depth must be at least 1".into(),
            });
        }
        if self.budget.default_cap == 0 {
            return Err(Error::Config {
                message: "budget.default_cap must be at least 1".into(),
            });
        }
        Ok(())
    }
}
