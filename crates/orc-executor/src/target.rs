//! Resolves which agent + pinned version a run targets, including the
//! bootstrap fallback shared by `run.start`, child-run creation (§4.5.6) and
//! workflow node execution.

use orc_core::config::ExecutorConfig;
use orc_core::{Agent, AgentVersion, Error, Result};
use orc_store::Store;

use crate::bootstrap::ensure_bootstrap_agent;

async fn load_active_version(store: &dyn Store, agent: Agent) -> Result<(Agent, AgentVersion)> {
    let version = store
        .get_agent_version(&agent.active_version_id)
        .await?
        .ok_or_else(|| Error::not_found("Agent version not found"))?;
    Ok((agent, version))
}

/// §4.5.1 / §9 resolveAgent: try `agent_id`, then `agent_slug`, falling
/// through to the lazily-created bootstrap agent when neither resolves.
pub async fn resolve_execution_target(
    store: &dyn Store,
    config: &ExecutorConfig,
    agent_id: Option<&str>,
    agent_slug: Option<&str>,
) -> Result<(Agent, AgentVersion)> {
    if let Some(id) = agent_id {
        if let Some(agent) = store.get_agent(id).await? {
            return load_active_version(store, agent).await;
        }
    }
    if let Some(slug) = agent_slug {
        if let Some(agent) = store.get_agent_by_slug(slug).await? {
            return load_active_version(store, agent).await;
        }
    }
    let agent = ensure_bootstrap_agent(store, config).await?;
    load_active_version(store, agent).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_store::InMemoryStore;

    #[tokio::test]
    async fn falls_back_to_bootstrap_when_nothing_resolves() {
        let store = InMemoryStore::new();
        let config = ExecutorConfig::default();
        let (agent, _version) = resolve_execution_target(&store, &config, None, None).await.unwrap();
        assert_eq!(agent.slug, config.main_router_slug);
    }

    #[tokio::test]
    async fn falls_back_to_bootstrap_when_ids_dont_resolve() {
        let store = InMemoryStore::new();
        let config = ExecutorConfig::default();
        let (agent, _version) =
            resolve_execution_target(&store, &config, Some("missing-id"), Some("missing-slug")).await.unwrap();
        assert_eq!(agent.slug, config.main_router_slug);
    }
}
