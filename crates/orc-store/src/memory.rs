//! In-process store backed by concurrent maps. Realizes the persisted
//! collection/index layout of §6 without depending on an external database:
//! `agents.slug` unique, `agent_versions.(agentId,version)` unique,
//! `events.(runId,seq)` unique and ordered.

use async_trait::async_trait;
use dashmap::DashMap;
use orc_core::{Agent, AgentVersion, Error, Event, EventType, Result, Run, Session, Workflow};
use serde_json::Value;

use crate::store::Store;

#[derive(Default)]
pub struct InMemoryStore {
    agents: DashMap<String, Agent>,
    agent_slug_index: DashMap<String, String>,
    agent_versions: DashMap<String, AgentVersion>,
    agent_version_index: DashMap<(String, u32), String>,
    sessions: DashMap<String, Session>,
    runs: DashMap<String, Run>,
    events: DashMap<String, Vec<Event>>,
    workflows: DashMap<String, Workflow>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_agent(&self, agent: Agent) -> Result<()> {
        if self.agent_slug_index.contains_key(&agent.slug) {
            tracing::warn!(slug = %agent.slug, "store: duplicate agent slug on insert");
            return Err(Error::store(format!("duplicate key: agents.slug = {}", agent.slug)));
        }
        self.agent_slug_index.insert(agent.slug.clone(), agent.id.clone());
        self.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn update_agent(&self, agent: Agent) -> Result<()> {
        self.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.get(id).map(|a| a.clone()))
    }

    async fn get_agent_by_slug(&self, slug: &str) -> Result<Option<Agent>> {
        let Some(id) = self.agent_slug_index.get(slug).map(|e| e.clone()) else {
            return Ok(None);
        };
        self.get_agent(&id).await
    }

    async fn get_agent_by_name_ci(&self, name: &str) -> Result<Option<Agent>> {
        Ok(self
            .agents
            .iter()
            .find(|e| e.value().name.eq_ignore_ascii_case(name))
            .map(|e| e.value().clone()))
    }

    async fn find_agents_by_any_tag(&self, tags: &[String]) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .iter()
            .filter(|e| e.value().metadata.tags.iter().any(|t| tags.contains(t)))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.iter().map(|e| e.value().clone()).collect())
    }

    async fn insert_agent_version(&self, version: AgentVersion) -> Result<()> {
        let key = (version.agent_id.clone(), version.version);
        if self.agent_version_index.contains_key(&key) {
            return Err(Error::store(format!(
                "duplicate key: agent_versions.(agentId,version) = {:?}",
                key
            )));
        }
        self.agent_version_index.insert(key, version.id.clone());
        self.agent_versions.insert(version.id.clone(), version);
        Ok(())
    }

    async fn get_agent_version(&self, id: &str) -> Result<Option<AgentVersion>> {
        Ok(self.agent_versions.get(id).map(|v| v.clone()))
    }

    async fn latest_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>> {
        Ok(self
            .agent_versions
            .iter()
            .filter(|e| e.value().agent_id == agent_id)
            .map(|e| e.value().clone())
            .max_by_key(|v| v.version))
    }

    async fn list_agent_versions(&self, agent_id: &str) -> Result<Vec<AgentVersion>> {
        let mut versions: Vec<AgentVersion> = self
            .agent_versions
            .iter()
            .filter(|e| e.value().agent_id == agent_id)
            .map(|e| e.value().clone())
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn insert_session(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn insert_run(&self, run: Run) -> Result<()> {
        self.runs.insert(run.id.clone(), run);
        Ok(())
    }

    async fn update_run(&self, run: Run) -> Result<()> {
        self.runs.insert(run.id.clone(), run);
        Ok(())
    }

    async fn get_run(&self, id: &str) -> Result<Option<Run>> {
        Ok(self.runs.get(id).map(|r| r.clone()))
    }

    async fn list_runs_for_session(&self, session_id: &str) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = self
            .runs
            .iter()
            .filter(|e| e.value().session_id == session_id)
            .map(|e| e.value().clone())
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    async fn count_runs_with_root(&self, root_run_id: &str) -> Result<usize> {
        Ok(self.runs.iter().filter(|e| e.value().root_run_id == root_run_id).count())
    }

    async fn append_event(&self, run_id: &str, event_type: EventType, payload: Value) -> Result<Event> {
        let mut entry = self.events.entry(run_id.to_string()).or_default();
        let next_seq = entry.last().map(|e| e.seq + 1).unwrap_or(1);
        let event = Event {
            id: orc_core::new_id(),
            run_id: run_id.to_string(),
            seq: next_seq,
            ts: chrono::Utc::now(),
            event_type,
            payload,
        };
        entry.push(event.clone());
        Ok(event)
    }

    async fn list_events(&self, run_id: &str, since_seq: u64) -> Result<Vec<Event>> {
        Ok(self
            .events
            .get(run_id)
            .map(|v| v.iter().filter(|e| e.seq > since_seq).cloned().collect())
            .unwrap_or_default())
    }

    async fn max_seq(&self, run_id: &str) -> Result<u64> {
        Ok(self.events.get(run_id).and_then(|v| v.last().map(|e| e.seq)).unwrap_or(0))
    }

    async fn insert_workflow(&self, workflow: Workflow) -> Result<()> {
        self.workflows.insert(workflow.id.clone(), workflow);
        Ok(())
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>> {
        Ok(self.workflows.get(id).map(|w| w.clone()))
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        Ok(self.workflows.iter().map(|e| e.value().clone()).collect())
    }
}
