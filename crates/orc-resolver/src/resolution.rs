use orc_core::{Agent, AgentMetadata, AgentOrigin, AgentVersion, CreatedBy, Result};
use orc_routing::{extract_domains_from_tags, infer_role_from_tags, merge_unique};
use orc_store::Store;
use serde::Serialize;
use serde_json::{json, Value};

use crate::spec::AgentSpec;

/// Provenance of the run whose plan proposed this agent spec (§4.4).
#[derive(Debug, Clone)]
pub struct ResolverContext {
    pub parent_run_id: Option<String>,
    pub root_run_id: String,
    pub created_by_agent_id: Option<String>,
    pub user_message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResolution {
    pub requested_slug: String,
    pub slug: String,
    pub agent_id: String,
    pub agent_version_id: String,
    pub reused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_new_agent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_new_version: Option<bool>,
}

fn synthesize_card(slug: &str, name: &str, tags: &[String]) -> Value {
    json!({
        "protocolVersion": "a2a/1.0",
        "name": name,
        "slug": slug,
        "skills": [{
            "id": format!("{slug}-skill"),
            "name": name,
            "tags": tags,
        }],
    })
}

fn origin_from_ctx(ctx: &ResolverContext) -> AgentOrigin {
    AgentOrigin {
        parent_run_id: ctx.parent_run_id.clone(),
        root_run_id: Some(ctx.root_run_id.clone()),
        created_by_agent_id: ctx.created_by_agent_id.clone(),
        user_message: Some(ctx.user_message.clone()),
    }
}

/// Ordered match search (§4.4): exact slug, then case-insensitive name,
/// then tag intersection.
async fn find_match(store: &dyn Store, spec: &AgentSpec, effective_tags: &[String]) -> Result<Option<(Agent, &'static str)>> {
    if let Some(agent) = store.get_agent_by_slug(&spec.slug).await? {
        return Ok(Some((agent, "slug")));
    }
    if let Some(agent) = store.get_agent_by_name_ci(&spec.name).await? {
        return Ok(Some((agent, "name")));
    }
    if !effective_tags.is_empty() {
        let candidates = store.find_agents_by_any_tag(effective_tags).await?;
        if let Some(agent) = candidates.into_iter().next() {
            return Ok(Some((agent, "tags")));
        }
    }
    Ok(None)
}

/// Resolves one `agentsToCreate[i]` spec to an existing or newly-created
/// agent + version (§4.4). Best-effort content-addressed lookup, not a
/// transaction (§9 deduplication consistency) — a concurrent insert of the
/// same new slug can still fail the store's unique-slug index.
pub async fn resolve_agent(store: &dyn Store, spec: &AgentSpec, ctx: &ResolverContext) -> Result<AgentResolution> {
    let effective_tags = spec.effective_tags();
    let matched = find_match(store, spec, &effective_tags).await?;

    let Some((existing, matched_on)) = matched else {
        tracing::debug!(slug = %spec.slug, "resolver: no match, creating new agent");
        return create_new_agent(store, spec, &effective_tags, ctx).await;
    };

    let latest = store
        .latest_agent_version(&existing.id)
        .await?
        .ok_or_else(|| orc_core::Error::not_found("Agent version not found"))?;

    if latest.system_prompt.trim() == spec.system_prompt.trim() {
        tracing::debug!(slug = %existing.slug, matched_on, "resolver: reusing existing agent");
        reuse_agent(store, existing, latest, &effective_tags, matched_on, &spec.slug).await
    } else {
        tracing::info!(slug = %existing.slug, matched_on, "resolver: appending new version, prompt changed");
        append_version(store, existing, latest, spec, &effective_tags, matched_on).await
    }
}

async fn create_new_agent(
    store: &dyn Store,
    spec: &AgentSpec,
    effective_tags: &[String],
    ctx: &ResolverContext,
) -> Result<AgentResolution> {
    let now = chrono::Utc::now();
    let agent_id = orc_core::new_id();
    let version_id = orc_core::new_id();

    let metadata = AgentMetadata {
        role: infer_role_from_tags(effective_tags),
        domains: extract_domains_from_tags(effective_tags),
        capabilities: vec![],
        tags: effective_tags.to_vec(),
        hidden: false,
        system: false,
        card: Some(synthesize_card(&spec.slug, &spec.name, effective_tags)),
        origin: Some(origin_from_ctx(ctx)),
    };

    let agent = Agent {
        id: agent_id.clone(),
        slug: spec.slug.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        active_version_id: version_id.clone(),
        created_at: now,
        updated_at: now,
        created_by: CreatedBy::Agent,
        metadata,
    };

    let version = AgentVersion {
        id: version_id.clone(),
        agent_id: agent_id.clone(),
        version: 1,
        system_prompt: spec.system_prompt.clone(),
        resources: spec.resources.clone(),
        io_schema: spec.io_schema.clone(),
        routing_hints: spec.routing_hints.clone(),
        created_at: now,
        created_by: CreatedBy::Agent,
    };

    store.insert_agent_version(version).await?;
    store.insert_agent(agent).await?;

    Ok(AgentResolution {
        requested_slug: spec.slug.clone(),
        slug: spec.slug.clone(),
        agent_id,
        agent_version_id: version_id,
        reused: false,
        matched_on: None,
        created_new_agent: Some(true),
        created_new_version: None,
    })
}

async fn reuse_agent(
    store: &dyn Store,
    mut existing: Agent,
    latest: AgentVersion,
    effective_tags: &[String],
    matched_on: &'static str,
    requested_slug: &str,
) -> Result<AgentResolution> {
    let merged_tags = merge_unique(&existing.metadata.tags, effective_tags);
    if merged_tags.len() != existing.metadata.tags.len() {
        existing.metadata.tags = merged_tags;
        existing.updated_at = chrono::Utc::now();
        store.update_agent(existing.clone()).await?;
    }

    Ok(AgentResolution {
        requested_slug: requested_slug.to_string(),
        slug: existing.slug.clone(),
        agent_id: existing.id.clone(),
        agent_version_id: latest.id,
        reused: true,
        matched_on: Some(matched_on.to_string()),
        created_new_agent: None,
        created_new_version: None,
    })
}

async fn append_version(
    store: &dyn Store,
    mut existing: Agent,
    latest: AgentVersion,
    spec: &AgentSpec,
    effective_tags: &[String],
    matched_on: &'static str,
) -> Result<AgentResolution> {
    let now = chrono::Utc::now();
    let version_id = orc_core::new_id();
    let version = AgentVersion {
        id: version_id.clone(),
        agent_id: existing.id.clone(),
        version: latest.version + 1,
        system_prompt: spec.system_prompt.clone(),
        resources: spec.resources.clone(),
        io_schema: spec.io_schema.clone(),
        routing_hints: spec.routing_hints.clone(),
        created_at: now,
        created_by: CreatedBy::Agent,
    };
    store.insert_agent_version(version).await?;

    existing.active_version_id = version_id.clone();
    existing.metadata.tags = merge_unique(&existing.metadata.tags, effective_tags);
    existing.updated_at = now;
    store.update_agent(existing.clone()).await?;

    Ok(AgentResolution {
        requested_slug: spec.slug.clone(),
        slug: existing.slug.clone(),
        agent_id: existing.id,
        agent_version_id: version_id,
        reused: false,
        matched_on: Some(format!("{matched_on}-updated")),
        created_new_agent: None,
        created_new_version: Some(true),
    })
}
