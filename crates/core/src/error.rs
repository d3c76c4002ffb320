//! Error types for the docvault domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all docvault operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Fetch errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by an upstream documentation source.
///
/// The taxonomy drives retry policy: `NotFound` is fatal for that key,
/// `RateLimited` and `Network` are transient and retried with backoff,
/// `Auth` is fatal and global (short-circuits further fetches until
/// credentials are corrected).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Documentation not found upstream: {library}{}", topic_suffix(.topic))]
    NotFound {
        library: String,
        topic: Option<String>,
    },

    #[error("Rate limited by documentation source, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

fn topic_suffix(topic: &Option<String>) -> String {
    match topic {
        Some(t) => format!("/{t}"),
        None => String::new(),
    }
}

impl FetchError {
    /// Whether this error is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_key() {
        let err = FetchError::NotFound {
            library: "tokio".into(),
            topic: Some("sync".into()),
        };
        assert!(err.to_string().contains("tokio/sync"));
    }

    #[test]
    fn not_found_without_topic() {
        let err = FetchError::NotFound {
            library: "serde".into(),
            topic: None,
        };
        assert!(err.to_string().ends_with("serde"));
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::RateLimited { retry_after_secs: 5 }.is_transient());
        assert!(FetchError::Network("conn refused".into()).is_transient());
        assert!(!FetchError::Auth("bad key".into()).is_transient());
        assert!(
            !FetchError::NotFound {
                library: "x".into(),
                topic: None
            }
            .is_transient()
        );
    }

    #[test]
    fn store_error_wraps_into_top_level() {
        let err: Error = StoreError::Storage("disk full".into()).into();
        assert!(err.to_string().contains("disk full"));
    }
}
