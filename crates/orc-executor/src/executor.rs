//! The Run Executor (§4.5): loads a run, resolves its agent, builds the
//! model-facing context, calls the model, and interprets the response as
//! either a final result or a plan to spawn further runs.
//!
//! `execute` recurses into itself for each child run it spawns. An ordinary
//! `async fn` cannot call itself directly — its generated future would have
//! to contain itself, an infinitely-sized type — so the public entry point
//! returns a boxed, pinned future and every recursive call goes through that
//! same boxing (`Box::pin`).

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use orc_core::config::{ExecutorConfig, ModelConfig};
use orc_core::{new_id, Agent, Error, Event, EventType, Result, Run, RunError, RunInput, RunOutput, RunStatus};
use orc_llm::{ModelCaller, ModelRequest};
use orc_resolver::{resolve_agent, AgentResolution, AgentSpec, ResolverContext};
use orc_routing::{build_agent_summary, merge_unique, summarize_result};
use orc_store::Store;
use serde_json::{json, Value};

use crate::a2a::A2A_INSTRUCTION;
use crate::context::{build_context, read_inherited_routing_state};
use crate::plan::{Plan, PlanValidation};
use crate::prompt_hash::prompt_hash;
use crate::target::resolve_execution_target;

/// Default message handed to a spawned child run when the plan did not
/// supply one, mirroring the workflow runner's default (§4.7).
const DEFAULT_CHILD_MESSAGE: &str = "Continue the plan and produce your result.";

pub struct Executor {
    store: Arc<dyn Store>,
    model: Arc<dyn ModelCaller>,
    config: Arc<ExecutorConfig>,
    model_config: Arc<ModelConfig>,
}

impl Executor {
    pub fn new(
        store: Arc<dyn Store>,
        model: Arc<dyn ModelCaller>,
        config: Arc<ExecutorConfig>,
        model_config: Arc<ModelConfig>,
    ) -> Self {
        Self { store, model, config, model_config }
    }

    /// Runs `run_id` to completion. Always returns `Ok(())` once the run
    /// itself could be loaded: any failure inside §4.5.1–§4.5.7 is trapped
    /// and recorded as the run's terminal `failed` state (§4.5.8) rather
    /// than propagated. A missing run is the one case that propagates, since
    /// there is no run document left to record the failure on.
    pub fn execute<'a>(&'a self, run_id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let run = self
                .store
                .get_run(run_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("Run not found: {run_id}")))?;

            if let Err(err) = self.run_steps(&run).await {
                self.fail_run(run_id, &err).await?;
            }
            Ok(())
        })
    }

    async fn emit(&self, run_id: &str, event_type: EventType, payload: Value) -> Result<Event> {
        self.store.append_event(run_id, event_type, payload).await
    }

    /// §4.5.1–§4.5.7. Any `?` here is caught by `execute` and turned into a
    /// failed terminal state.
    async fn run_steps(&self, run: &Run) -> Result<()> {
        self.emit(&run.id, EventType::RunStarted, json!({})).await?;

        let agent = self
            .store
            .get_agent(&run.agent_id)
            .await?
            .ok_or_else(|| Error::not_found("Agent not found"))?;
        let version = match self.store.get_agent_version(&run.agent_version_id).await? {
            Some(v) => v,
            None => self
                .store
                .get_agent_version(&agent.active_version_id)
                .await?
                .ok_or_else(|| Error::not_found("Agent version not found"))?,
        };

        self.emit(
            &run.id,
            EventType::PromptLoaded,
            json!({ "agentId": agent.id, "agentVersionId": version.id, "slug": agent.slug }),
        )
        .await?;

        let all_agents = self.store.list_agents().await?;
        let inherited = read_inherited_routing_state(run.input.context.as_ref().unwrap_or(&Value::Null));
        let context = build_context(&agent, run.input.context.as_ref().unwrap_or(&Value::Null), &inherited, &all_agents, &self.config);

        let system_prompt = format!("{}\n{}", version.system_prompt, A2A_INSTRUCTION);
        let user_content = format!(
            "{}\n\nContext:\n{}",
            run.input.user_message,
            serde_json::to_string_pretty(&context).unwrap_or_default()
        );
        let hash = prompt_hash(&system_prompt, &run.input.user_message);

        self.emit(&run.id, EventType::ModelRequest, json!({ "model": self.model_config.model_name, "promptHash": hash }))
            .await?;

        let request = ModelRequest::new(self.model_config.model_name.clone(), system_prompt, user_content, 0.2);
        let response = self.model.call(request).await?;

        let parsed: Value = serde_json::from_str(&response.content).unwrap_or(Value::Null);
        let response_type = parsed.get("type").and_then(|v| v.as_str());
        match response_type {
            Some("final") | Some("plan") => {}
            _ => return Err(Error::validation("Model response missing type plan/final")),
        }
        self.emit(&run.id, EventType::ModelResponse, parsed.clone()).await?;

        match response_type {
            Some("final") => self.finish_final(run, &parsed).await,
            Some("plan") => self.run_plan(run, &agent, &all_agents, &inherited, &parsed).await,
            _ => unreachable!("validated above"),
        }
    }

    /// §4.5.4.
    async fn finish_final(&self, run: &Run, parsed: &Value) -> Result<()> {
        let result = parsed.get("result").cloned().unwrap_or(Value::Null);
        let mut updated = run.clone();
        updated.output = Some(RunOutput { result });
        updated.status = RunStatus::Succeeded;
        updated.ended_at = Some(chrono::Utc::now());
        self.store.update_run(updated).await?;
        self.emit(&run.id, EventType::RunFinished, json!({ "status": "succeeded" })).await?;
        Ok(())
    }

    /// §4.5.5–§4.5.7.
    async fn run_plan(
        &self,
        run: &Run,
        agent: &Agent,
        all_agents: &[Agent],
        inherited: &crate::context::InheritedRoutingState,
        parsed: &Value,
    ) -> Result<()> {
        let plan = Plan::parse(parsed)?;
        let running_summary = build_agent_summary(agent);
        let known_routers: Vec<String> = all_agents
            .iter()
            .map(build_agent_summary)
            .filter(|s| s.role.as_deref() == Some("router"))
            .map(|s| s.slug)
            .collect();

        let visited_with_self = merge_unique(&inherited.visited_slugs, &[agent.slug.clone()]);
        let already_spawned = self.store.count_runs_with_root(&run.root_run_id).await?.saturating_sub(1);

        let validation = PlanValidation {
            plan: &plan,
            running_role: running_summary.role.as_deref(),
            known_routers: &known_routers,
            routing_depth: inherited.routing_depth,
            max_depth: self.config.max_depth,
            max_children: self.config.max_children,
            visited_slugs: &visited_with_self,
            already_spawned,
            spawn_cap: self.config.spawn_cap,
        };
        validation.validate()?;

        let agents_to_create_slugs: Vec<String> = plan
            .agents_to_create
            .iter()
            .map(|v| v.get("slug").and_then(|s| s.as_str()).unwrap_or("").to_string())
            .collect();
        let runs_to_execute_slugs: Vec<String> = plan.runs_to_execute.iter().map(|c| c.slug.clone()).collect();
        self.emit(
            &run.id,
            EventType::SpawnAgentRequest,
            json!({ "agentsToCreate": agents_to_create_slugs, "runsToExecute": runs_to_execute_slugs }),
        )
        .await?;

        let resolver_ctx = ResolverContext {
            parent_run_id: run.parent_run_id.clone(),
            root_run_id: run.root_run_id.clone(),
            created_by_agent_id: Some(agent.id.clone()),
            user_message: run.input.user_message.clone(),
        };

        let mut resolutions: BTreeMap<String, AgentResolution> = BTreeMap::new();
        let mut created_agent_slugs: Vec<String> = Vec::new();
        for raw_spec in &plan.agents_to_create {
            let spec = AgentSpec::parse(raw_spec).map_err(Error::validation)?;
            let requested_slug = spec.slug.clone();
            let resolution = resolve_agent(self.store.as_ref(), &spec, &resolver_ctx).await?;
            self.emit(&run.id, EventType::SpawnAgentCreated, serde_json::to_value(&resolution)?).await?;
            created_agent_slugs.push(resolution.slug.clone());
            resolutions.insert(requested_slug, resolution);
        }

        let all_sibling_slugs: Vec<String> = runs_to_execute_slugs.clone();
        let mut child_outputs: BTreeMap<String, Value> = BTreeMap::new();
        let mut executed_agents: Vec<String> = Vec::new();

        for child in &plan.runs_to_execute {
            let child_visited = merge_unique(&visited_with_self, &all_sibling_slugs);
            let previous_results: serde_json::Map<String, Value> = child_outputs
                .iter()
                .map(|(slug, value)| (slug.clone(), summarize_result(value)))
                .collect();

            let child_context = json!({
                "parentPlan": plan.raw,
                "previousResults": Value::Object(previous_results),
                "explicitContext": child.context.clone().unwrap_or(Value::Null),
                "routingPolicy": { "maxDepth": self.config.max_depth, "maxChildren": self.config.max_children },
                "routingState": { "visitedSlugs": child_visited, "routingDepth": inherited.routing_depth + 1 },
            });

            let (target_agent, target_version) = match resolutions.get(&child.slug) {
                Some(resolution) => {
                    let agent = self
                        .store
                        .get_agent(&resolution.agent_id)
                        .await?
                        .ok_or_else(|| Error::not_found("Agent not found"))?;
                    let version = self
                        .store
                        .get_agent_version(&resolution.agent_version_id)
                        .await?
                        .ok_or_else(|| Error::not_found("Agent version not found"))?;
                    (agent, version)
                }
                None => resolve_execution_target(self.store.as_ref(), &self.config, None, Some(&child.slug)).await?,
            };

            let now = chrono::Utc::now();
            let child_run = Run {
                id: new_id(),
                session_id: run.session_id.clone(),
                agent_id: target_agent.id.clone(),
                agent_version_id: target_version.id.clone(),
                status: RunStatus::Running,
                parent_run_id: Some(run.id.clone()),
                root_run_id: run.root_run_id.clone(),
                input: RunInput {
                    user_message: child.user_message.clone().unwrap_or_else(|| DEFAULT_CHILD_MESSAGE.to_string()),
                    context: Some(child_context),
                },
                output: None,
                error: None,
                started_at: now,
                ended_at: None,
            };
            self.store.insert_run(child_run.clone()).await?;
            self.emit(&run.id, EventType::ChildRunStarted, json!({ "childRunId": child_run.id, "slug": child.slug }))
                .await?;

            self.execute(&child_run.id).await?;

            let finished = self
                .store
                .get_run(&child_run.id)
                .await?
                .ok_or_else(|| Error::not_found("Run not found"))?;
            let status_str = match finished.status {
                RunStatus::Succeeded => "succeeded",
                RunStatus::Failed => "failed",
                _ => "running",
            };
            let result_value = match (&finished.output, &finished.error) {
                (Some(output), _) => output.result.clone(),
                (None, Some(error)) => json!({ "error": error.message }),
                (None, None) => Value::Null,
            };
            child_outputs.insert(child.slug.clone(), result_value);
            executed_agents.push(child.slug.clone());
            self.emit(
                &run.id,
                EventType::ChildRunFinished,
                json!({ "childRunId": child_run.id, "status": status_str }),
            )
            .await?;
        }

        let plan_summary = json!({
            "createdAgents": created_agent_slugs,
            "executedAgents": executed_agents,
        });
        let result = json!({
            "childResultsBySlug": child_outputs,
            "planSummary": plan_summary,
        });

        let mut updated = run.clone();
        updated.output = Some(RunOutput { result });
        updated.status = RunStatus::Succeeded;
        updated.ended_at = Some(chrono::Utc::now());
        self.store.update_run(updated).await?;
        self.emit(&run.id, EventType::RunFinished, json!({ "status": "succeeded" })).await?;
        Ok(())
    }

    /// §4.5.8: records the terminal failed state. `RUN_FINISHED` always
    /// remains the last event for the run.
    async fn fail_run(&self, run_id: &str, err: &Error) -> Result<()> {
        let mut run = self
            .store
            .get_run(run_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Run not found: {run_id}")))?;

        let error_event = self.emit(run_id, EventType::Error, json!({ "message": err.message() })).await?;

        run.status = RunStatus::Failed;
        run.error = Some(RunError { message: err.message(), last_event_seq: error_event.seq });
        run.ended_at = Some(chrono::Utc::now());
        self.store.update_run(run).await?;

        self.emit(run_id, EventType::RunFinished, json!({ "status": "failed" })).await?;
        Ok(())
    }
}

/// Creates a run with the given agent/version already resolved, status
/// `running`, and calls the executor on it. Shared by the `run.start` RPC
/// handler and the workflow runner (§4.5.1, §4.7) so both go through the
/// identical bootstrap-fallback + run-creation path.
///
/// With `parent_run_id` absent, the new run is its own root. With it
/// present, the parent run is loaded and its `rootRunId` is inherited so the
/// new run joins the parent's spawn-cap tree instead of starting a fresh one.
pub async fn start_and_execute(
    executor: &Executor,
    session_id: &str,
    agent_id: Option<&str>,
    agent_slug: Option<&str>,
    user_message: String,
    context: Option<Value>,
) -> Result<Run> {
    start_and_execute_with_parent(executor, session_id, agent_id, agent_slug, user_message, context, None).await
}

/// As [`start_and_execute`], but allows explicitly naming a `parent_run_id`
/// so the created run is not itself a root run.
pub async fn start_and_execute_with_parent(
    executor: &Executor,
    session_id: &str,
    agent_id: Option<&str>,
    agent_slug: Option<&str>,
    user_message: String,
    context: Option<Value>,
    parent_run_id: Option<&str>,
) -> Result<Run> {
    let (agent, version) =
        resolve_execution_target(executor.store.as_ref(), &executor.config, agent_id, agent_slug).await?;

    let now = chrono::Utc::now();
    let run_id = new_id();
    let root_run_id = match parent_run_id {
        Some(parent_id) => {
            let parent = executor
                .store
                .get_run(parent_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("Run not found: {parent_id}")))?;
            parent.root_run_id
        }
        None => run_id.clone(),
    };

    let run = Run {
        id: run_id.clone(),
        session_id: session_id.to_string(),
        agent_id: agent.id.clone(),
        agent_version_id: version.id.clone(),
        status: RunStatus::Running,
        parent_run_id: parent_run_id.map(|s| s.to_string()),
        root_run_id,
        input: RunInput { user_message, context },
        output: None,
        error: None,
        started_at: now,
        ended_at: None,
    };
    executor.store.insert_run(run.clone()).await?;
    executor.execute(&run.id).await?;
    executor.store.get_run(&run.id).await?.ok_or_else(|| Error::not_found(format!("Run not found: {run_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_core::{Agent, AgentMetadata, AgentVersion, CreatedBy};
    use orc_llm::MockProvider;
    use orc_store::InMemoryStore;

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new())
    }

    fn executor(store: Arc<InMemoryStore>) -> Executor {
        Executor::new(
            store,
            Arc::new(MockProvider::default()),
            Arc::new(ExecutorConfig::default()),
            Arc::new(ModelConfig {
                model_name: "mock".to_string(),
                openai_api_key: None,
                fireworks_api_key: None,
                fireworks_model: None,
            }),
        )
    }

    async fn insert_agent(store: &InMemoryStore, slug: &str, role: Option<orc_core::Role>, prompt: &str) -> Agent {
        let now = chrono::Utc::now();
        let agent_id = new_id();
        let version_id = new_id();
        let version = AgentVersion {
            id: version_id.clone(),
            agent_id: agent_id.clone(),
            version: 1,
            system_prompt: prompt.to_string(),
            resources: vec![],
            io_schema: None,
            routing_hints: Default::default(),
            created_at: now,
            created_by: CreatedBy::System,
        };
        let agent = Agent {
            id: agent_id.clone(),
            slug: slug.to_string(),
            name: slug.to_string(),
            description: None,
            active_version_id: version_id,
            created_at: now,
            updated_at: now,
            created_by: CreatedBy::System,
            metadata: AgentMetadata { role, ..Default::default() },
        };
        store.insert_agent_version(version).await.unwrap();
        store.insert_agent(agent.clone()).await.unwrap();
        agent
    }

    #[tokio::test]
    async fn final_only_run_succeeds_with_five_events() {
        let s = store();
        insert_agent(&s, "mock-echo", Some(orc_core::Role::Specialist), "You are an echo agent.").await;
        let exec = executor(s.clone());
        let run = start_and_execute(&exec, "session-1", None, Some("mock-echo"), "final only: hello there".to_string(), None)
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);
        let events = s.list_events(&run.id, 0).await.unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].event_type, EventType::RunStarted);
        assert_eq!(events[4].event_type, EventType::RunFinished);
    }

    struct ScriptedProvider;

    #[async_trait::async_trait]
    impl ModelCaller for ScriptedProvider {
        async fn call(&self, request: ModelRequest) -> std::result::Result<orc_llm::ModelResponse, orc_llm::ModelError> {
            let system = &request.messages[0].content;
            let content = if system.contains("route requests") {
                json!({
                    "type": "plan",
                    "agentsToCreate": [{
                        "slug": "mock-echo",
                        "name": "Mock Echo",
                        "systemPrompt": "You are a mock echo specialist agent used for offline testing.",
                        "metadata": { "tags": ["specialist"] },
                    }],
                    "runsToExecute": [{ "slug": "mock-echo", "userMessage": "final only: echo this" }],
                })
            } else {
                json!({ "type": "final", "result": { "echoed": true } })
            };
            Ok(orc_llm::ModelResponse { content: content.to_string() })
        }
    }

    #[tokio::test]
    async fn plan_run_spawns_one_child_and_merges_results() {
        let s = store();
        insert_agent(&s, "router", Some(orc_core::Role::Router), "route requests").await;
        let exec = Executor::new(
            s.clone(),
            Arc::new(ScriptedProvider),
            Arc::new(ExecutorConfig::default()),
            Arc::new(ModelConfig {
                model_name: "mock".to_string(),
                openai_api_key: None,
                fireworks_api_key: None,
                fireworks_model: None,
            }),
        );
        let run = start_and_execute(&exec, "session-1", None, Some("router"), "please help".to_string(), None)
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);
        let output = run.output.unwrap().result;
        let created = output["planSummary"]["createdAgents"].as_array().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0], json!("mock-echo"));
        assert_eq!(output["childResultsBySlug"]["mock-echo"], json!({ "echoed": true }));
    }

    struct TwoAgentProvider;

    #[async_trait::async_trait]
    impl ModelCaller for TwoAgentProvider {
        async fn call(&self, request: ModelRequest) -> std::result::Result<orc_llm::ModelResponse, orc_llm::ModelError> {
            let system = &request.messages[0].content;
            let content = if system.contains("route requests") {
                json!({
                    "type": "plan",
                    "agentsToCreate": [
                        {
                            "slug": "zebra",
                            "name": "Zebra",
                            "systemPrompt": "You are the zebra specialist agent used for offline testing.",
                            "metadata": { "tags": ["specialist"] },
                        },
                        {
                            "slug": "alpha",
                            "name": "Alpha",
                            "systemPrompt": "You are the alpha specialist agent used for offline testing.",
                            "metadata": { "tags": ["specialist"] },
                        },
                    ],
                    "runsToExecute": [],
                })
            } else {
                json!({ "type": "final", "result": { "echoed": true } })
            };
            Ok(orc_llm::ModelResponse { content: content.to_string() })
        }
    }

    #[tokio::test]
    async fn created_agents_summary_preserves_plan_order_not_alphabetical() {
        let s = store();
        insert_agent(&s, "router", Some(orc_core::Role::Router), "route requests").await;
        let exec = Executor::new(
            s.clone(),
            Arc::new(TwoAgentProvider),
            Arc::new(ExecutorConfig::default()),
            Arc::new(ModelConfig {
                model_name: "mock".to_string(),
                openai_api_key: None,
                fireworks_api_key: None,
                fireworks_model: None,
            }),
        );
        let run = start_and_execute(&exec, "session-1", None, Some("router"), "please help".to_string(), None)
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);
        let output = run.output.unwrap().result;
        let created = output["planSummary"]["createdAgents"].as_array().unwrap();
        assert_eq!(created, &vec![json!("zebra"), json!("alpha")]);
    }

    #[tokio::test]
    async fn bad_model_response_fails_the_run_with_single_error_event() {
        struct BadProvider;
        #[async_trait::async_trait]
        impl ModelCaller for BadProvider {
            async fn call(&self, _req: ModelRequest) -> std::result::Result<orc_llm::ModelResponse, orc_llm::ModelError> {
                Ok(orc_llm::ModelResponse { content: "not json".to_string() })
            }
        }
        let s = store();
        insert_agent(&s, "broken", Some(orc_core::Role::Specialist), "broken prompt").await;
        let exec = Executor::new(
            s.clone(),
            Arc::new(BadProvider),
            Arc::new(ExecutorConfig::default()),
            Arc::new(ModelConfig {
                model_name: "mock".to_string(),
                openai_api_key: None,
                fireworks_api_key: None,
                fireworks_model: None,
            }),
        );
        let run = start_and_execute(&exec, "session-1", None, Some("broken"), "hi".to_string(), None).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.unwrap().message, "Model response missing type plan/final");
        let events = s.list_events(&run.id, 0).await.unwrap();
        let error_count = events.iter().filter(|e| e.event_type == EventType::Error).count();
        assert_eq!(error_count, 1);
        assert_eq!(events.last().unwrap().event_type, EventType::RunFinished);
    }

    #[tokio::test]
    async fn anti_loop_rejects_delegating_back_into_visited_slug() {
        struct LoopingProvider;
        #[async_trait::async_trait]
        impl ModelCaller for LoopingProvider {
            async fn call(&self, _req: ModelRequest) -> std::result::Result<orc_llm::ModelResponse, orc_llm::ModelError> {
                Ok(orc_llm::ModelResponse {
                    content: json!({ "type": "plan", "runsToExecute": [{"slug": "router"}] }).to_string(),
                })
            }
        }
        let s = store();
        insert_agent(&s, "router", Some(orc_core::Role::Router), "route").await;
        let exec = Executor::new(
            s.clone(),
            Arc::new(LoopingProvider),
            Arc::new(ExecutorConfig::default()),
            Arc::new(ModelConfig {
                model_name: "mock".to_string(),
                openai_api_key: None,
                fireworks_api_key: None,
                fireworks_model: None,
            }),
        );
        let run = start_and_execute(&exec, "session-1", None, Some("router"), "hi".to_string(), None).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.unwrap().message, "Slug already executed in this run tree: router");
    }

    #[tokio::test]
    async fn start_and_execute_with_parent_inherits_root_run_id() {
        let s = store();
        insert_agent(&s, "mock-echo", Some(orc_core::Role::Specialist), "You are an echo agent.").await;
        let exec = executor(s.clone());
        let root = start_and_execute(&exec, "session-1", None, Some("mock-echo"), "final only: first".to_string(), None)
            .await
            .unwrap();
        let child = start_and_execute_with_parent(
            &exec,
            "session-1",
            None,
            Some("mock-echo"),
            "final only: second".to_string(),
            None,
            Some(&root.id),
        )
        .await
        .unwrap();
        assert_eq!(child.root_run_id, root.id);
        assert_eq!(child.parent_run_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(s.count_runs_with_root(&root.id).await.unwrap(), 2);
    }
}
