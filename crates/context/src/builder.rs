//! The budget-constrained context builder.
//!
//! A deterministic, ordered greedy algorithm: sort, accumulate,
//! summarize-or-truncate the first overflow, drop the rest. The budget is a
//! hard invariant — the assembled text's estimated tokens never exceed it.

use crate::artifact::Artifact;
use crate::token;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Separator placed between included artifact sections.
const SECTION_SEPARATOR: &str = "\n\n";

/// What happened to one artifact during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Included whole.
    Included,
    /// Replaced by its category's summary template.
    Summarized,
    /// Cut to a prefix sized to the remaining budget.
    Truncated,
    /// Left out entirely.
    Dropped,
}

/// Per-artifact assembly outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub id: String,
    pub disposition: Disposition,
    /// Tokens this artifact contributed to the output (0 when dropped).
    pub tokens: usize,
}

/// Metadata about one assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Total estimated tokens in the assembled text.
    pub total_tokens: usize,
    /// The budget the run was given.
    pub budget: usize,
    /// Budget utilization percentage (0.0–100.0).
    pub utilization_pct: f32,
    /// Outcome for every input artifact, in assembly order.
    pub outcomes: Vec<ArtifactOutcome>,
}

/// The assembled context plus metadata.
#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub text: String,
    pub metadata: BuildMetadata,
}

/// The context builder. Stateless per call — create one and reuse it.
pub struct ContextBuilder {
    truncation_marker: String,
    summaries: HashMap<String, String>,
}

impl ContextBuilder {
    /// Create a builder with the default `[truncated]` marker and no
    /// summary templates.
    pub fn new() -> Self {
        Self {
            truncation_marker: "[truncated]".into(),
            summaries: HashMap::new(),
        }
    }

    /// Override the truncation marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.truncation_marker = marker.into();
        self
    }

    /// Register a summary template for an artifact category.
    pub fn with_summary(mut self, category: impl Into<String>, template: impl Into<String>) -> Self {
        self.summaries.insert(category.into(), template.into());
        self
    }

    /// Assemble artifacts into a single string within `token_budget`.
    ///
    /// # Algorithm
    ///
    /// 1. Sort by `(priority, insertion index)` ascending (stable ties)
    /// 2. Include whole artifacts while they fit, counting separators
    /// 3. At the first overflow: substitute the category summary if it
    ///    fits, else truncate to exactly the remaining budget; either way
    ///    append the truncation marker
    /// 4. Drop every artifact after the first overflow
    pub fn build(&self, artifacts: &[Artifact], token_budget: usize) -> BuiltContext {
        let mut order: Vec<usize> = (0..artifacts.len()).collect();
        order.sort_by_key(|&i| (artifacts[i].priority, i));

        let marker_text = format!("\n{}", self.truncation_marker);
        let marker_tokens = token::estimate_tokens(&marker_text);
        let separator_tokens = token::estimate_tokens(SECTION_SEPARATOR);

        let mut used = 0usize;
        let mut sections: Vec<String> = Vec::new();
        let mut outcomes: Vec<ArtifactOutcome> = Vec::new();
        let mut overflowed = false;

        for &i in &order {
            let artifact = &artifacts[i];

            if overflowed {
                // Everything after the first overflow is dropped whole;
                // partial inclusion of lower-priority artifacts would let
                // them displace higher-priority content on a later run.
                outcomes.push(ArtifactOutcome {
                    id: artifact.id.clone(),
                    disposition: Disposition::Dropped,
                    tokens: 0,
                });
                continue;
            }

            let sep = if sections.is_empty() { 0 } else { separator_tokens };
            let whole_cost = sep + artifact.token_estimate();

            if used + whole_cost <= token_budget {
                sections.push(artifact.content.clone());
                used += whole_cost;
                outcomes.push(ArtifactOutcome {
                    id: artifact.id.clone(),
                    disposition: Disposition::Included,
                    tokens: whole_cost,
                });
                continue;
            }

            // First overflow: summary, then truncation, then drop.
            overflowed = true;
            let remaining = token_budget - used;

            if let Some((section, tokens)) =
                self.summary_section(artifact, remaining, sep, marker_tokens, &marker_text)
            {
                sections.push(section);
                used += tokens;
                outcomes.push(ArtifactOutcome {
                    id: artifact.id.clone(),
                    disposition: Disposition::Summarized,
                    tokens,
                });
                continue;
            }

            match Self::truncated_section(artifact, remaining, sep, marker_tokens, &marker_text) {
                Some((section, tokens)) => {
                    sections.push(section);
                    used += tokens;
                    outcomes.push(ArtifactOutcome {
                        id: artifact.id.clone(),
                        disposition: Disposition::Truncated,
                        tokens,
                    });
                }
                None => {
                    debug!(id = %artifact.id, "No budget left for even a truncated prefix");
                    outcomes.push(ArtifactOutcome {
                        id: artifact.id.clone(),
                        disposition: Disposition::Dropped,
                        tokens: 0,
                    });
                }
            }
        }

        let text = sections.join(SECTION_SEPARATOR);
        let total_tokens = token::estimate_tokens(&text);
        let utilization_pct = if token_budget == 0 {
            0.0
        } else {
            (total_tokens as f32 / token_budget as f32) * 100.0
        };

        BuiltContext {
            text,
            metadata: BuildMetadata {
                total_tokens,
                budget: token_budget,
                utilization_pct,
                outcomes,
            },
        }
    }

    /// Render the artifact's category summary if one is configured and fits.
    fn summary_section(
        &self,
        artifact: &Artifact,
        remaining: usize,
        sep: usize,
        marker_tokens: usize,
        marker_text: &str,
    ) -> Option<(String, usize)> {
        let category = artifact.category.as_deref()?;
        let template = self.summaries.get(category)?;
        let tokens = sep + token::estimate_tokens(template) + marker_tokens;
        if tokens <= remaining {
            Some((format!("{template}{marker_text}"), tokens))
        } else {
            None
        }
    }

    /// Cut the artifact to a prefix sized to exactly the remaining budget.
    fn truncated_section(
        artifact: &Artifact,
        remaining: usize,
        sep: usize,
        marker_tokens: usize,
        marker_text: &str,
    ) -> Option<(String, usize)> {
        let overhead = sep + marker_tokens;
        if remaining <= overhead {
            return None;
        }
        let prefix_tokens = remaining - overhead;

        // Floor to a char boundary; a prefix of N tokens is at most 4N bytes.
        let mut cut = (prefix_tokens * 4).min(artifact.content.len());
        while !artifact.content.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            return None;
        }

        let prefix = &artifact.content[..cut];
        let tokens = sep + token::estimate_tokens(prefix) + marker_tokens;
        Some((format!("{prefix}{marker_text}"), tokens))
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::estimate_tokens;

    fn artifact(id: &str, content: String, priority: i32) -> Artifact {
        Artifact::new(id, content, priority)
    }

    fn outcome<'a>(result: &'a BuiltContext, id: &str) -> &'a ArtifactOutcome {
        result
            .metadata
            .outcomes
            .iter()
            .find(|o| o.id == id)
            .unwrap()
    }

    #[test]
    fn everything_fits_under_generous_budget() {
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("a", "first artifact".into(), 1),
            artifact("b", "second artifact".into(), 2),
        ];

        let result = builder.build(&artifacts, 4096);
        assert!(result.text.contains("first artifact"));
        assert!(result.text.contains("second artifact"));
        assert_eq!(outcome(&result, "a").disposition, Disposition::Included);
        assert_eq!(outcome(&result, "b").disposition, Disposition::Included);
    }

    #[test]
    fn output_never_exceeds_budget() {
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("a", "x".repeat(2000), 1),
            artifact("b", "y".repeat(2000), 2),
            artifact("c", "z".repeat(2000), 3),
        ];

        for budget in [0, 1, 3, 10, 100, 250, 700, 5000] {
            let result = builder.build(&artifacts, budget);
            assert!(
                estimate_tokens(&result.text) <= budget,
                "budget {budget} exceeded: {}",
                estimate_tokens(&result.text)
            );
        }
    }

    #[test]
    fn scenario_a_low_priority_dropped_entirely() {
        // budget=100; two 1000-byte artifacts (~250 tokens each)
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("spec", "s".repeat(1000), 1),
            artifact("stories", "y".repeat(1000), 2),
        ];

        let result = builder.build(&artifacts, 100);
        assert!(estimate_tokens(&result.text) <= 100);
        assert!(result.text.contains('s'));
        assert!(!result.text.contains('y'), "stories must be entirely dropped");
        assert_eq!(outcome(&result, "spec").disposition, Disposition::Truncated);
        assert_eq!(outcome(&result, "stories").disposition, Disposition::Dropped);
        assert!(result.text.contains("[truncated]"));
    }

    #[test]
    fn higher_priority_fully_included_before_lower_touched() {
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("high", "h".repeat(200), 1), // 50 tokens
            artifact("low", "l".repeat(2000), 2), // 500 tokens
        ];

        let result = builder.build(&artifacts, 100);
        // High fits whole; low is the first overflow and gets truncated.
        assert_eq!(outcome(&result, "high").disposition, Disposition::Included);
        assert_eq!(outcome(&result, "low").disposition, Disposition::Truncated);
        assert!(result.text.starts_with(&"h".repeat(200)));
    }

    #[test]
    fn insertion_order_breaks_priority_ties() {
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("first", "AAAA".into(), 5),
            artifact("second", "BBBB".into(), 5),
        ];

        let result = builder.build(&artifacts, 4096);
        let a_pos = result.text.find("AAAA").unwrap();
        let b_pos = result.text.find("BBBB").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn deterministic_assembly() {
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("a", "a".repeat(900), 2),
            artifact("b", "b".repeat(900), 1),
            artifact("c", "c".repeat(900), 3),
        ];

        let r1 = builder.build(&artifacts, 300);
        let r2 = builder.build(&artifacts, 300);
        assert_eq!(r1.text, r2.text);
        assert_eq!(r1.metadata.total_tokens, r2.metadata.total_tokens);
    }

    #[test]
    fn summary_substituted_when_it_fits() {
        let builder =
            ContextBuilder::new().with_summary("spec", "Spec overview: core requirements only.");
        let artifacts = vec![
            artifact("intro", "i".repeat(200), 1), // 50 tokens
            Artifact::new("spec", "s".repeat(4000), 2).with_category("spec"), // 1000 tokens
        ];

        let result = builder.build(&artifacts, 100);
        assert_eq!(outcome(&result, "spec").disposition, Disposition::Summarized);
        assert!(result.text.contains("Spec overview"));
        assert!(result.text.contains("[truncated]"));
        assert!(estimate_tokens(&result.text) <= 100);
    }

    #[test]
    fn oversized_summary_falls_back_to_truncation() {
        let builder = ContextBuilder::new().with_summary("spec", "S".repeat(4000));
        let artifacts = vec![Artifact::new("spec", "body text ".repeat(100), 1).with_category("spec")];

        let result = builder.build(&artifacts, 50);
        assert_eq!(outcome(&result, "spec").disposition, Disposition::Truncated);
        assert!(estimate_tokens(&result.text) <= 50);
    }

    #[test]
    fn zero_budget_produces_empty_output() {
        let builder = ContextBuilder::new();
        let artifacts = vec![artifact("a", "content".into(), 1)];

        let result = builder.build(&artifacts, 0);
        assert!(result.text.is_empty());
        assert_eq!(outcome(&result, "a").disposition, Disposition::Dropped);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let builder = ContextBuilder::new();
        // Multi-byte content: each char is 3 bytes
        let artifacts = vec![artifact("uni", "日本語のドキュメント".repeat(100), 1)];

        let result = builder.build(&artifacts, 20);
        // Must not panic and must stay within budget
        assert!(estimate_tokens(&result.text) <= 20);
    }

    #[test]
    fn empty_artifact_list() {
        let builder = ContextBuilder::new();
        let result = builder.build(&[], 100);
        assert!(result.text.is_empty());
        assert_eq!(result.metadata.total_tokens, 0);
        assert!(result.metadata.outcomes.is_empty());
    }

    #[test]
    fn metadata_totals_accurate() {
        let builder = ContextBuilder::new();
        let artifacts = vec![
            artifact("a", "alpha content".into(), 1),
            artifact("b", "beta content".into(), 2),
        ];

        let result = builder.build(&artifacts, 4096);
        assert_eq!(result.metadata.total_tokens, estimate_tokens(&result.text));
        assert_eq!(result.metadata.budget, 4096);
        assert!(result.metadata.utilization_pct > 0.0);
        assert!(result.metadata.utilization_pct <= 100.0);
    }

    #[test]
    fn custom_marker_used() {
        let builder = ContextBuilder::new().with_marker("<cut>");
        let artifacts = vec![artifact("a", "m".repeat(1000), 1)];

        let result = builder.build(&artifacts, 50);
        assert!(result.text.contains("<cut>"));
        assert!(!result.text.contains("[truncated]"));
    }
}
