//! Static documentation source — an in-process map of seeded documents.
//!
//! Used for offline operation (vendored doc snapshots) and as a test
//! double. Anything not seeded is `NotFound`.

use async_trait::async_trait;
use docvault_core::error::FetchError;
use docvault_core::key::CacheKey;
use docvault_core::source::{DocContent, DocSource};
use std::collections::HashMap;

/// A `DocSource` backed by a fixed in-memory map.
#[derive(Default)]
pub struct StaticDocSource {
    docs: HashMap<CacheKey, String>,
}

impl StaticDocSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document for a library's top-level key.
    pub fn with_library(mut self, library: &str, text: impl Into<String>) -> Self {
        self.docs.insert(CacheKey::library(library), text.into());
        self
    }

    /// Seed a document for a library topic.
    pub fn with_topic(mut self, library: &str, topic: &str, text: impl Into<String>) -> Self {
        self.docs.insert(CacheKey::topic(library, topic), text.into());
        self
    }

    /// Number of seeded documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl DocSource for StaticDocSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(
        &self,
        library: &str,
        topic: Option<&str>,
    ) -> Result<DocContent, FetchError> {
        let key = match topic {
            Some(t) => CacheKey::topic(library, t),
            None => CacheKey::library(library),
        };

        match self.docs.get(&key) {
            Some(text) => Ok(DocContent::new(text.clone())),
            None => Err(FetchError::NotFound {
                library: library.to_string(),
                topic: topic.map(String::from),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_docs_are_served() {
        let source = StaticDocSource::new()
            .with_library("tokio", "Async runtime overview")
            .with_topic("tokio", "sync", "Channels and locks");

        let overview = source.fetch("tokio", None).await.unwrap();
        assert_eq!(overview.text, "Async runtime overview");

        let sync = source.fetch("tokio", Some("sync")).await.unwrap();
        assert_eq!(sync.text, "Channels and locks");
    }

    #[tokio::test]
    async fn unseeded_key_is_not_found() {
        let source = StaticDocSource::new().with_library("tokio", "docs");

        let err = source.fetch("tokio", Some("net")).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));

        let err = source.fetch("serde", None).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }
}
