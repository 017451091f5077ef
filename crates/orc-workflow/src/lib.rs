//! Linear DAG evaluator over a saved `Workflow` (§4.7). No implicit
//! topological sort: nodes run strictly in persisted order, and a node's
//! declared parents must already have a recorded output by the time it is
//! reached, or the whole run aborts.

use orc_core::{Error, Result, Workflow};
use orc_executor::{start_and_execute, Executor};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRunResult {
    pub node_id: String,
    pub agent_slug: String,
    pub run_id: String,
    pub status: String,
    pub output: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunResult {
    pub runs: Vec<NodeRunResult>,
    pub final_output: Value,
}

fn default_continuation_message() -> String {
    "Continue from previous agent output and produce the next step.".to_string()
}

/// Executes every node of `workflow` once, in persisted order (§4.7).
pub async fn run_workflow(executor: &Executor, workflow: &Workflow, session_id: &str, user_message: &str) -> Result<WorkflowRunResult> {
    let mut outputs_by_node: HashMap<String, Value> = HashMap::new();
    let mut runs = Vec::with_capacity(workflow.nodes.len());

    for node in &workflow.nodes {
        let mut parent_outputs = serde_json::Map::new();
        for parent_id in &node.parents {
            let Some(output) = outputs_by_node.get(parent_id) else {
                return Err(Error::validation("Parent outputs missing"));
            };
            parent_outputs.insert(parent_id.clone(), output.clone());
        }

        let context = json!({
            "parentOutputs": Value::Object(parent_outputs),
            "workflowUserMessage": user_message,
            "nodeLabel": node.label,
        });

        let node_message =
            if node.include_user_prompt { user_message.to_string() } else { default_continuation_message() };

        let run = start_and_execute(executor, session_id, None, Some(&node.agent_slug), node_message, Some(context))
            .await?;

        let status = format!("{:?}", run.status).to_lowercase();
        let output = match (&run.output, &run.error) {
            (Some(out), _) => out.result.clone(),
            (None, Some(err)) => json!({ "error": err.message }),
            (None, None) => Value::Null,
        };

        outputs_by_node.insert(node.id.clone(), output.clone());
        runs.push(NodeRunResult {
            node_id: node.id.clone(),
            agent_slug: node.agent_slug.clone(),
            run_id: run.id.clone(),
            status,
            output,
        });
    }

    let final_output = runs.last().map(|r| r.output.clone()).unwrap_or(Value::Null);
    Ok(WorkflowRunResult { runs, final_output })
}
