//! Builds the context object handed to the model alongside the user message
//! (§4.5.2). Pure function of (agent, run, roster, config) — no I/O.

use orc_core::{config::ExecutorConfig, Agent};
use orc_routing::{
    build_agent_summary, build_router_index, build_specialist_index, merge_unique,
    read_routing_state, summarize_agents,
};
use serde_json::{json, Value};

use crate::a2a::DirectoryAgent;

/// The routing state as read off the running agent's own input context,
/// before `self.slug` is folded into `visitedSlugs` for outbound display.
/// Validation (§4.5.5) uses these raw values, not the display-augmented ones.
#[derive(Debug, Clone)]
pub struct InheritedRoutingState {
    pub visited_slugs: Vec<String>,
    pub routing_depth: u32,
}

pub fn read_inherited_routing_state(run_context: &Value) -> InheritedRoutingState {
    let parsed = read_routing_state(run_context);
    InheritedRoutingState { visited_slugs: parsed.visited_slugs, routing_depth: parsed.routing_depth }
}

/// Builds the full context object sent to the model (§4.5.2). `run_context`
/// is the run's stored `input.context` (carrying `parentPlan`,
/// `previousResults`, `explicitContext` when this is a child run).
pub fn build_context(
    agent: &Agent,
    run_context: &Value,
    inherited: &InheritedRoutingState,
    all_agents: &[Agent],
    config: &ExecutorConfig,
) -> Value {
    let summary = build_agent_summary(agent);
    let is_router = summary.role.as_deref() == Some("router");
    let is_directory_agent = agent.slug == config.main_router_slug;

    let mut context = serde_json::Map::new();

    context.insert("availableAgentsSummary".to_string(), json!(summarize_agents(all_agents)));

    let routers = build_router_index(all_agents, config.router_index_limit);
    context.insert("availableRouters".to_string(), json!(routers));

    if is_router {
        let domains = if summary.domains.is_empty() { vec![] } else { summary.domains.clone() };
        let specialists = build_specialist_index(all_agents, config.specialist_index_limit, &domains);
        context.insert("availableSpecialists".to_string(), json!(specialists));
    }

    context.insert(
        "routingPolicy".to_string(),
        json!({ "maxDepth": config.max_depth, "maxChildren": config.max_children }),
    );

    let visited_with_self = merge_unique(&inherited.visited_slugs, &[agent.slug.clone()]);
    context.insert(
        "routingState".to_string(),
        json!({ "visitedSlugs": visited_with_self, "routingDepth": inherited.routing_depth }),
    );

    context.insert("self".to_string(), serde_json::to_value(&summary).unwrap_or(Value::Null));

    let directory_agent = DirectoryAgent::new(&config.main_router_slug);
    context.insert(
        "a2a".to_string(),
        json!({ "directoryAgent": directory_agent }),
    );

    if is_directory_agent {
        let roster: Vec<_> = all_agents.iter().map(build_agent_summary).collect();
        context.insert("availableAgents".to_string(), json!(roster));
    }

    for field in ["parentPlan", "previousResults", "explicitContext"] {
        if let Some(value) = run_context.get(field) {
            context.insert(field.to_string(), value.clone());
        }
    }

    Value::Object(context)
}
