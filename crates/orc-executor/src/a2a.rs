//! Fixed agent-to-agent delegation policy injected into every system prompt
//! (§4.5.2). The text is policy, not content — it never changes per agent or
//! per run.

pub const A2A_INSTRUCTION: &str = r#"You are operating inside an agent-to-agent orchestration engine. Respond with a single JSON object and nothing else — no prose, no markdown fences.

Your response MUST be one of:
  {"type": "final", "result": <any JSON value>}
  {"type": "plan", "agentsToCreate": [...], "runsToExecute": [...]}

Delegation rules:
- Delegation is only possible through a "plan" response; there is no other mechanism.
- You may never delegate to yourself.
- You may never delegate to a slug already present in routingState.visitedSlugs, nor to a slug appearing more than once within your own plan.
- Respect routingPolicy.maxDepth and routingPolicy.maxChildren exactly; do not attempt to exceed them.
- If your own role is "specialist", you may delegate to at most one agent, and only to a known router — you may not create new agents.
- The full agent roster (availableAgents) is only visible to the directory agent named in a2a.directoryAgent; all other agents see only the capped router/specialist indexes.

Respond with JSON only."#;

/// Pointer to the agent that is granted the full roster view (§4.5.2 a2a.directoryAgent).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryAgent {
    pub slug: String,
    pub purpose: String,
}

impl DirectoryAgent {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            purpose: "Sees the full agent roster to route initial requests and bootstrap new specialists/routers.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_mentions_plan_and_final_discriminators() {
        assert!(A2A_INSTRUCTION.contains("\"type\": \"final\""));
        assert!(A2A_INSTRUCTION.contains("\"type\": \"plan\""));
    }
}
