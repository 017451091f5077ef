//! Lazy bootstrap/directory agent creation (§4.5.1, §9 resolveAgent fallback).

use orc_core::config::ExecutorConfig;
use orc_core::{new_id, Agent, AgentMetadata, AgentVersion, CreatedBy, Result, Role, RoutingHints};
use orc_store::Store;
use serde_json::json;

fn bootstrap_system_prompt(name: &str) -> String {
    format!(
        "You are {name}, the directory agent for an agent orchestration engine. \
         You see the full roster of available agents (availableAgents) and route \
         incoming requests to an existing router or specialist when one fits, or \
         propose new agents via a plan when none does."
    )
}

fn bootstrap_card(slug: &str, name: &str) -> serde_json::Value {
    json!({
        "protocolVersion": "a2a/1.0",
        "name": name,
        "slug": slug,
        "skills": [{
            "id": format!("{slug}-skill"),
            "name": name,
            "tags": ["router", "directory"],
        }],
    })
}

/// Returns the agent at `config.main_router_slug`, creating it with a fresh
/// version 1 if absent. A race between two roots both observing "absent" is
/// an accepted failure mode (§5, §9 deduplication consistency): the losing
/// insert fails its unique-slug index and that caller re-fetches.
pub async fn ensure_bootstrap_agent(store: &dyn Store, config: &ExecutorConfig) -> Result<Agent> {
    if let Some(agent) = store.get_agent_by_slug(&config.main_router_slug).await? {
        return Ok(agent);
    }

    let now = chrono::Utc::now();
    let agent_id = new_id();
    let version_id = new_id();

    let version = AgentVersion {
        id: version_id.clone(),
        agent_id: agent_id.clone(),
        version: 1,
        system_prompt: bootstrap_system_prompt(&config.main_router_name),
        resources: vec![],
        io_schema: None,
        routing_hints: RoutingHints { tags: vec!["router".into()], ..Default::default() },
        created_at: now,
        created_by: CreatedBy::System,
    };

    let agent = Agent {
        id: agent_id.clone(),
        slug: config.main_router_slug.clone(),
        name: config.main_router_name.clone(),
        description: Some("Directory agent: sees the full roster and bootstraps new agents.".to_string()),
        active_version_id: version_id.clone(),
        created_at: now,
        updated_at: now,
        created_by: CreatedBy::System,
        metadata: AgentMetadata {
            role: Some(Role::Router),
            domains: vec![],
            capabilities: vec![],
            tags: vec!["router".into(), "directory".into()],
            hidden: false,
            system: true,
            card: Some(bootstrap_card(&config.main_router_slug, &config.main_router_name)),
            origin: None,
        },
    };

    store.insert_agent_version(version).await?;
    match store.insert_agent(agent.clone()).await {
        Ok(()) => Ok(agent),
        Err(_) => store
            .get_agent_by_slug(&config.main_router_slug)
            .await?
            .ok_or_else(|| orc_core::Error::not_found("Agent not found")),
    }
}
