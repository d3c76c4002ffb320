//! DocSource trait — the upstream documentation provider boundary.
//!
//! Everything beyond this trait (HTTP APIs, vendored snapshots, test
//! fixtures) is an external collaborator. The cache engine only sees
//! `fetch` and the error taxonomy in [`FetchError`](crate::error::FetchError).

use crate::error::FetchError;
use async_trait::async_trait;

/// Documentation content returned by an upstream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocContent {
    /// The raw documentation text.
    pub text: String,
}

impl DocContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An upstream source of library/API documentation.
///
/// Implementations: HTTP docs API, static in-process map (offline/tests).
#[async_trait]
pub trait DocSource: Send + Sync {
    /// The source name (e.g., "http", "static").
    fn name(&self) -> &str;

    /// Fetch documentation for a library, optionally narrowed to a topic.
    async fn fetch(
        &self,
        library: &str,
        topic: Option<&str>,
    ) -> std::result::Result<DocContent, FetchError>;
}
