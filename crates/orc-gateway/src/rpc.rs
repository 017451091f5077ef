//! JSON-RPC method dispatch (§4.6, §6). Every handler takes the already
//! JSON-decoded `params` and returns either a result value or a
//! `(code, message)` pair for the envelope layer to wrap.

use orc_core::{new_id, Agent, AgentVersion, CreatedBy, Error, Run, Session, Workflow, WorkflowNode};
use orc_executor::start_and_execute_with_parent;
use orc_workflow::run_workflow;
use serde_json::{json, Value};

use crate::state::AppState;

pub type RpcResult = Result<Value, (i32, String)>;

fn param_err(field: &str) -> (i32, String) {
    (-32602, format!("Missing required param: {field}"))
}

fn require_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, (i32, String)> {
    params.get(field).and_then(|v| v.as_str()).ok_or_else(|| param_err(field))
}

fn opt_str<'a>(params: &'a Value, field: &str) -> Option<&'a str> {
    params.get(field).and_then(|v| v.as_str())
}

fn from_err(err: Error) -> (i32, String) {
    (err.rpc_code(), err.message())
}

/// Top-level dispatch, matched on bare method name (§6). Unknown methods are
/// the caller's responsibility to map to `-32601`; this function only knows
/// about the methods it implements.
pub async fn route_rpc(method: &str, params: Value, state: &AppState) -> RpcResult {
    match method {
        "session.create" => session_create(params, state).await,
        "session.list" => session_list(params, state).await,
        "agent.list" => agent_list(params, state).await,
        "agent.get" => agent_get(params, state).await,
        "agent.version.get" => agent_version_get(params, state).await,
        "agent.updatePrompt" => agent_update_prompt(params, state).await,
        "agent.setActiveVersion" => agent_set_active_version(params, state).await,
        "run.start" => run_start(params, state).await,
        "run.get" => run_get(params, state).await,
        "run.events" => run_events(params, state).await,
        "run.tree" => run_tree(params, state).await,
        "workflow.save" => workflow_save(params, state).await,
        "workflow.list" => workflow_list(params, state).await,
        "workflow.get" => workflow_get(params, state).await,
        "workflow.run" => workflow_run(params, state).await,
        other => Err((-32601, format!("Method not found: {other}"))),
    }
}

async fn session_create(params: Value, state: &AppState) -> RpcResult {
    let title = opt_str(&params, "title").map(|s| s.to_string());
    let session = Session { id: new_id(), title, created_at: chrono::Utc::now(), metadata: json!({}) };
    state.store.insert_session(session.clone()).await.map_err(from_err)?;
    Ok(json!({ "sessionId": session.id }))
}

async fn session_list(params: Value, state: &AppState) -> RpcResult {
    let limit = params.get("limit").and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(50).clamp(1, 200);
    let sessions = state.store.list_sessions(limit).await.map_err(from_err)?;
    Ok(json!({ "sessions": sessions }))
}

async fn agent_list(params: Value, state: &AppState) -> RpcResult {
    let include_hidden = params.get("includeHidden").and_then(|v| v.as_bool()).unwrap_or(false);
    let agents = state.store.list_agents().await.map_err(from_err)?;
    let agents: Vec<Agent> = agents.into_iter().filter(|a| include_hidden || !a.metadata.hidden).collect();
    Ok(json!({ "agents": agents }))
}

async fn resolve_agent_param(params: &Value, state: &AppState) -> Result<Agent, (i32, String)> {
    if let Some(agent_id) = opt_str(params, "agentId") {
        return state
            .store
            .get_agent(agent_id)
            .await
            .map_err(from_err)?
            .ok_or_else(|| from_err(Error::not_found("Agent not found")));
    }
    if let Some(slug) = opt_str(params, "slug") {
        return state
            .store
            .get_agent_by_slug(slug)
            .await
            .map_err(from_err)?
            .ok_or_else(|| from_err(Error::not_found("Agent not found")));
    }
    Err(param_err("agentId|slug"))
}

async fn agent_get(params: Value, state: &AppState) -> RpcResult {
    let agent = resolve_agent_param(&params, state).await?;
    let active_version = state
        .store
        .get_agent_version(&agent.active_version_id)
        .await
        .map_err(from_err)?
        .ok_or_else(|| from_err(Error::not_found("Agent version not found")))?;
    let versions = state.store.list_agent_versions(&agent.id).await.map_err(from_err)?;
    Ok(json!({ "agent": agent, "activeVersion": active_version, "versions": versions }))
}

async fn agent_version_get(params: Value, state: &AppState) -> RpcResult {
    let version_id = require_str(&params, "versionId")?;
    let version = state
        .store
        .get_agent_version(version_id)
        .await
        .map_err(from_err)?
        .ok_or_else(|| from_err(Error::not_found("Agent version not found")))?;
    if let Some(agent_id) = opt_str(&params, "agentId") {
        if version.agent_id != agent_id {
            return Err(from_err(Error::not_found("Agent version not found")));
        }
    }
    Ok(json!({ "version": version }))
}

async fn agent_update_prompt(params: Value, state: &AppState) -> RpcResult {
    let agent_id = require_str(&params, "agentId")?;
    let new_system_prompt = require_str(&params, "newSystemPrompt")?;
    let editor = opt_str(&params, "editor");

    let mut agent =
        state.store.get_agent(agent_id).await.map_err(from_err)?.ok_or_else(|| from_err(Error::not_found("Agent not found")))?;
    let latest = state
        .store
        .latest_agent_version(agent_id)
        .await
        .map_err(from_err)?
        .ok_or_else(|| from_err(Error::not_found("Agent version not found")))?;

    let now = chrono::Utc::now();
    let new_version_id = new_id();
    let new_version = AgentVersion {
        id: new_version_id.clone(),
        agent_id: agent_id.to_string(),
        version: latest.version + 1,
        system_prompt: new_system_prompt.to_string(),
        resources: latest.resources.clone(),
        io_schema: latest.io_schema.clone(),
        routing_hints: latest.routing_hints.clone(),
        created_at: now,
        created_by: if editor.is_some() { CreatedBy::User } else { CreatedBy::System },
    };
    state.store.insert_agent_version(new_version.clone()).await.map_err(from_err)?;

    agent.active_version_id = new_version_id.clone();
    agent.updated_at = now;
    state.store.update_agent(agent).await.map_err(from_err)?;

    Ok(json!({ "agentVersionId": new_version_id, "version": new_version.version }))
}

async fn agent_set_active_version(params: Value, state: &AppState) -> RpcResult {
    let agent_id = require_str(&params, "agentId")?;
    let version_id = require_str(&params, "versionId")?;

    let mut agent =
        state.store.get_agent(agent_id).await.map_err(from_err)?.ok_or_else(|| from_err(Error::not_found("Agent not found")))?;
    let version = state
        .store
        .get_agent_version(version_id)
        .await
        .map_err(from_err)?
        .ok_or_else(|| from_err(Error::not_found("Agent version not found")))?;
    if version.agent_id != agent_id {
        return Err(from_err(Error::validation("Version does not belong to agent")));
    }

    agent.active_version_id = version_id.to_string();
    agent.updated_at = chrono::Utc::now();
    state.store.update_agent(agent).await.map_err(from_err)?;

    Ok(json!({ "activeVersionId": version_id }))
}

async fn run_start(params: Value, state: &AppState) -> RpcResult {
    let session_id = require_str(&params, "sessionId")?;
    let user_message = require_str(&params, "userMessage")?.to_string();
    let agent_slug = opt_str(&params, "agentSlug");
    let agent_id = opt_str(&params, "agentId");
    let parent_run_id = opt_str(&params, "parentRunId");
    let context = params.get("context").cloned();

    let run = start_and_execute_with_parent(
        &state.executor,
        session_id,
        agent_id,
        agent_slug,
        user_message,
        context,
        parent_run_id,
    )
    .await
    .map_err(from_err)?;

    Ok(json!({ "runId": run.id }))
}

async fn run_get(params: Value, state: &AppState) -> RpcResult {
    let run_id = require_str(&params, "runId")?;
    let run: Run =
        state.store.get_run(run_id).await.map_err(from_err)?.ok_or_else(|| from_err(Error::not_found("Run not found")))?;
    Ok(json!({ "run": run }))
}

async fn run_events(params: Value, state: &AppState) -> RpcResult {
    let run_id = require_str(&params, "runId")?;
    let since_seq = params.get("sinceSeq").and_then(|v| v.as_u64()).unwrap_or(0);
    let events = state.store.list_events(run_id, since_seq).await.map_err(from_err)?;
    let next_seq = state.store.max_seq(run_id).await.map_err(from_err)?;
    Ok(json!({ "events": events, "nextSeq": next_seq }))
}

async fn run_tree(params: Value, state: &AppState) -> RpcResult {
    let session_id = require_str(&params, "sessionId")?;
    let runs = state.store.list_runs_for_session(session_id).await.map_err(from_err)?;

    let mut denormalized = Vec::with_capacity(runs.len());
    for run in runs {
        let agent = state.store.get_agent(&run.agent_id).await.map_err(from_err)?;
        let mut entry = serde_json::to_value(&run).map_err(|e| from_err(Error::from(e)))?;
        if let Value::Object(map) = &mut entry {
            map.insert("agentSlug".to_string(), json!(agent.as_ref().map(|a| a.slug.clone())));
            map.insert("agentName".to_string(), json!(agent.as_ref().map(|a| a.name.clone())));
        }
        denormalized.push(entry);
    }
    Ok(json!({ "runs": denormalized }))
}

async fn workflow_save(params: Value, state: &AppState) -> RpcResult {
    let name = require_str(&params, "name")?.to_string();
    let description = opt_str(&params, "description").map(|s| s.to_string());
    let workflow_id = opt_str(&params, "workflowId").map(|s| s.to_string()).unwrap_or_else(new_id);
    let nodes_value = params.get("nodes").cloned().unwrap_or(json!([]));
    let nodes: Vec<WorkflowNode> =
        serde_json::from_value(nodes_value).map_err(|e| from_err(Error::validation(format!("invalid nodes: {e}"))))?;

    let workflow = Workflow { id: workflow_id.clone(), name, description, nodes };
    state.store.insert_workflow(workflow).await.map_err(from_err)?;
    Ok(json!({ "workflowId": workflow_id }))
}

async fn workflow_list(_params: Value, state: &AppState) -> RpcResult {
    let workflows = state.store.list_workflows().await.map_err(from_err)?;
    Ok(json!({ "workflows": workflows }))
}

async fn workflow_get(params: Value, state: &AppState) -> RpcResult {
    let workflow_id = require_str(&params, "workflowId")?;
    let workflow = state
        .store
        .get_workflow(workflow_id)
        .await
        .map_err(from_err)?
        .ok_or_else(|| from_err(Error::not_found("Workflow not found")))?;
    Ok(json!({ "workflow": workflow }))
}

async fn workflow_run(params: Value, state: &AppState) -> RpcResult {
    let workflow_id = require_str(&params, "workflowId")?;
    let session_id = require_str(&params, "sessionId")?;
    let user_message = require_str(&params, "userMessage")?;

    let workflow = state
        .store
        .get_workflow(workflow_id)
        .await
        .map_err(from_err)?
        .ok_or_else(|| from_err(Error::not_found("Workflow not found")))?;

    let result = run_workflow(&state.executor, &workflow, session_id, user_message).await.map_err(from_err)?;
    serde_json::to_value(result).map_err(|e| from_err(Error::from(e)))
}
