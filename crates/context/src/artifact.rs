//! Artifact — a unit of candidate content competing for budget.

use crate::token;
use serde::{Deserialize, Serialize};

/// A piece of candidate documentation with an inclusion priority.
///
/// Artifacts are ephemeral: constructed per request by the caller and
/// discarded after context assembly. The token estimate is derived from the
/// content, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Caller-chosen identifier, used in assembly metadata.
    pub id: String,

    /// Optional category, used to look up a summary template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// The candidate text.
    pub content: String,

    /// Lower = more important. Ties broken by insertion order.
    pub priority: i32,
}

impl Artifact {
    pub fn new(id: impl Into<String>, content: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            category: None,
            content: content.into(),
            priority,
        }
    }

    /// Tag the artifact with a category for summary-template lookup.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Estimated token cost of the full content.
    pub fn token_estimate(&self) -> usize {
        token::estimate_tokens(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_derived_from_content() {
        let artifact = Artifact::new("spec", "a".repeat(1000), 1);
        assert_eq!(artifact.token_estimate(), 250);
    }

    #[test]
    fn category_builder() {
        let artifact = Artifact::new("spec", "text", 1).with_category("spec");
        assert_eq!(artifact.category.as_deref(), Some("spec"));
    }
}
