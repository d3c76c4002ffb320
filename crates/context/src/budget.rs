//! Per-agent token budget resolution.

use std::collections::HashMap;

/// Resolves an agent identifier to its token cap.
///
/// Pure lookup: every agent resolves to exactly one cap, falling back to
/// the default for unknown agents.
#[derive(Debug, Clone)]
pub struct BudgetAllocator {
    per_agent_caps: HashMap<String, usize>,
    default_cap: usize,
}

impl BudgetAllocator {
    pub fn new(per_agent_caps: HashMap<String, usize>, default_cap: usize) -> Self {
        Self {
            per_agent_caps,
            default_cap,
        }
    }

    /// The token cap for an agent.
    pub fn resolve_cap(&self, agent_id: &str) -> usize {
        self.per_agent_caps
            .get(agent_id)
            .copied()
            .unwrap_or(self.default_cap)
    }
}
