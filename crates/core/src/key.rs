//! Cache key — the address of one documentation record.

use serde::{Deserialize, Serialize};

/// Identifies one cached documentation record.
///
/// An absent topic is a distinct, explicitly allowed key (the library's
/// top-level documentation), not a wildcard over the library's topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Library name, e.g. "tokio".
    pub library: String,

    /// Optional topic within the library, e.g. "sync".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl CacheKey {
    /// Key for a library's top-level documentation.
    pub fn library(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            topic: None,
        }
    }

    /// Key for a specific topic within a library.
    pub fn topic(library: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            topic: Some(topic.into()),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.topic {
            Some(topic) => write!(f, "{}/{}", self.library, topic),
            None => write!(f, "{}", self.library),
        }
    }
}
