//! Typed CRUD gateway over the engine's persisted collections.
//!
//! `Store` is the only shared resource in the concurrency model (§5): every
//! run exclusively writes its own event stream and run document, while
//! agent metadata/versions may be concurrently touched by plan resolution.
//! Deduplication is by-query-then-insert, not transactional — see
//! `orc-resolver` for the algorithm built on top of this trait.

use async_trait::async_trait;
use orc_core::{Agent, AgentVersion, Event, EventType, Result, Run, Session, Workflow};
use serde_json::Value;

#[async_trait]
pub trait Store: Send + Sync {
    // agents
    async fn insert_agent(&self, agent: Agent) -> Result<()>;
    async fn update_agent(&self, agent: Agent) -> Result<()>;
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>>;
    async fn get_agent_by_slug(&self, slug: &str) -> Result<Option<Agent>>;
    async fn get_agent_by_name_ci(&self, name: &str) -> Result<Option<Agent>>;
    async fn find_agents_by_any_tag(&self, tags: &[String]) -> Result<Vec<Agent>>;
    async fn list_agents(&self) -> Result<Vec<Agent>>;

    // agent versions
    async fn insert_agent_version(&self, version: AgentVersion) -> Result<()>;
    async fn get_agent_version(&self, id: &str) -> Result<Option<AgentVersion>>;
    async fn latest_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>>;
    /// All versions of an agent, ordered by version ascending.
    async fn list_agent_versions(&self, agent_id: &str) -> Result<Vec<AgentVersion>>;

    // sessions
    async fn insert_session(&self, session: Session) -> Result<()>;
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;
    async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>>;

    // runs
    async fn insert_run(&self, run: Run) -> Result<()>;
    async fn update_run(&self, run: Run) -> Result<()>;
    async fn get_run(&self, id: &str) -> Result<Option<Run>>;
    async fn list_runs_for_session(&self, session_id: &str) -> Result<Vec<Run>>;
    /// Count of runs (including the root itself) sharing `root_run_id`.
    async fn count_runs_with_root(&self, root_run_id: &str) -> Result<usize>;

    // events
    /// Allocates the next `seq` for `run_id` (current max + 1) and inserts
    /// atomically (§4.1).
    async fn append_event(&self, run_id: &str, event_type: EventType, payload: Value) -> Result<Event>;
    async fn list_events(&self, run_id: &str, since_seq: u64) -> Result<Vec<Event>>;
    async fn max_seq(&self, run_id: &str) -> Result<u64>;

    // workflows
    async fn insert_workflow(&self, workflow: Workflow) -> Result<()>;
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>>;
    async fn list_workflows(&self) -> Result<Vec<Workflow>>;
}
