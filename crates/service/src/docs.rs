//! The agent-facing entry point.
//!
//! `request_docs` combines lookup, per-agent budget resolution, and
//! budget-constrained assembly into the single call agents use. Lookup
//! failures arrive as clearly marked placeholder artifacts, so one broken
//! library never stops the pipeline.

use crate::lookup::LookupService;
use docvault_context::{Artifact, BudgetAllocator, BuiltContext, ContextBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One documentation request from an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRequest {
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Lower = more important within this agent's context window.
    pub priority: i32,
}

impl DocRequest {
    pub fn new(library: impl Into<String>, topic: Option<String>, priority: i32) -> Self {
        Self {
            library: library.into(),
            topic,
            priority,
        }
    }
}

/// Combines [`LookupService`], [`BudgetAllocator`], and [`ContextBuilder`]
/// into the agent-facing documentation call.
pub struct DocService {
    lookup: Arc<LookupService>,
    allocator: BudgetAllocator,
    builder: ContextBuilder,
}

impl DocService {
    pub fn new(
        lookup: Arc<LookupService>,
        allocator: BudgetAllocator,
        builder: ContextBuilder,
    ) -> Self {
        Self {
            lookup,
            allocator,
            builder,
        }
    }

    /// Resolve all requests and assemble them within the agent's token cap.
    pub async fn request_docs(&self, agent_id: &str, requests: &[DocRequest]) -> String {
        self.request_docs_detailed(agent_id, requests).await.text
    }

    /// Like [`request_docs`](Self::request_docs) but keeps the assembly
    /// metadata, for callers that report budget utilization.
    pub async fn request_docs_detailed(
        &self,
        agent_id: &str,
        requests: &[DocRequest],
    ) -> BuiltContext {
        let mut artifacts = Vec::with_capacity(requests.len());

        for request in requests {
            let result = self
                .lookup
                .lookup(&request.library, request.topic.as_deref(), request.priority)
                .await;

            let id = match &request.topic {
                Some(topic) => format!("{}/{}", request.library, topic),
                None => request.library.clone(),
            };

            // Category = library, so summary templates can be configured
            // per library.
            artifacts.push(
                Artifact::new(id, result.content, request.priority)
                    .with_category(request.library.clone()),
            );
        }

        let cap = self.allocator.resolve_cap(agent_id);
        let built = self.builder.build(&artifacts, cap);
        debug!(
            agent_id,
            cap,
            total_tokens = built.metadata.total_tokens,
            requests = requests.len(),
            "Assembled documentation context"
        );
        built
    }
}
