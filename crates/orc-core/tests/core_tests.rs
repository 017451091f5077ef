use orc_core::*;
use serde_json::json;

// ===========================================================================
// Agent / AgentVersion
// ===========================================================================

#[test]
fn agent_round_trips_through_json() {
    let agent = Agent {
        id: new_id(),
        slug: "demo-echo".into(),
        name: "Demo Echo".into(),
        description: Some("echoes input".into()),
        active_version_id: new_id(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        created_by: CreatedBy::System,
        metadata: AgentMetadata {
            role: Some(Role::Specialist),
            tags: vec!["alpha".into()],
            ..Default::default()
        },
    };
    let value = serde_json::to_value(&agent).unwrap();
    assert_eq!(value["slug"], json!("demo-echo"));
    assert_eq!(value["metadata"]["role"], json!("specialist"));
    let back: Agent = serde_json::from_value(value).unwrap();
    assert_eq!(back.slug, agent.slug);
    assert_eq!(back.effective_role(), Some(Role::Specialist));
}

#[test]
fn agent_metadata_defaults_are_empty_and_visible() {
    let metadata = AgentMetadata::default();
    assert!(metadata.role.is_none());
    assert!(metadata.domains.is_empty());
    assert!(!metadata.hidden);
}

#[test]
fn agent_version_serializes_camel_case_fields() {
    let version = AgentVersion {
        id: new_id(),
        agent_id: new_id(),
        version: 1,
        system_prompt: "you are helpful".into(),
        resources: vec![],
        io_schema: None,
        routing_hints: RoutingHints::default(),
        created_at: chrono::Utc::now(),
        created_by: CreatedBy::Agent,
    };
    let value = serde_json::to_value(&version).unwrap();
    assert!(value.get("systemPrompt").is_some());
    assert!(value.get("agentId").is_some());
}

// ===========================================================================
// Run lifecycle
// ===========================================================================

#[test]
fn run_is_terminal_only_for_succeeded_or_failed() {
    let mut run = sample_run();
    assert!(!run.is_terminal());
    run.status = RunStatus::Succeeded;
    assert!(run.is_terminal());
    run.status = RunStatus::Failed;
    assert!(run.is_terminal());
    run.status = RunStatus::Queued;
    assert!(!run.is_terminal());
}

#[test]
fn run_root_run_id_defaults_to_self_when_no_parent() {
    let run = sample_run();
    assert!(run.parent_run_id.is_none());
    assert_eq!(run.root_run_id, run.id);
}

fn sample_run() -> Run {
    let id = new_id();
    Run {
        id: id.clone(),
        session_id: new_id(),
        agent_id: new_id(),
        agent_version_id: new_id(),
        status: RunStatus::Running,
        parent_run_id: None,
        root_run_id: id,
        input: RunInput { user_message: "hi".into(), context: None },
        output: None,
        error: None,
        started_at: chrono::Utc::now(),
        ended_at: None,
    }
}

// ===========================================================================
// Event
// ===========================================================================

#[test]
fn event_type_serializes_screaming_snake_case() {
    let event = Event {
        id: new_id(),
        run_id: new_id(),
        seq: 1,
        ts: chrono::Utc::now(),
        event_type: EventType::RunStarted,
        payload: json!({}),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], json!("RUN_STARTED"));
}

#[test]
fn event_type_round_trips_all_variants() {
    let variants = [
        EventType::RunStarted,
        EventType::PromptLoaded,
        EventType::ModelRequest,
        EventType::ModelResponse,
        EventType::SpawnAgentRequest,
        EventType::SpawnAgentCreated,
        EventType::ChildRunStarted,
        EventType::ChildRunFinished,
        EventType::RunFinished,
        EventType::Error,
    ];
    for v in variants {
        let s = serde_json::to_string(&v).unwrap();
        let back: EventType = serde_json::from_str(&s).unwrap();
        assert_eq!(back, v);
    }
}

// ===========================================================================
// Protocol envelope
// ===========================================================================

#[test]
fn rpc_response_ok_omits_error_field() {
    let resp = RpcResponse::ok(json!(1), json!({"sessionId": "abc"}));
    let value = serde_json::to_value(&resp).unwrap();
    assert!(value.get("error").is_none());
    assert_eq!(value["result"]["sessionId"], json!("abc"));
}

#[test]
fn rpc_response_err_omits_result_field() {
    let resp = RpcResponse::method_not_found(json!(1), "bogus.method");
    let value = serde_json::to_value(&resp).unwrap();
    assert!(value.get("result").is_none());
    assert_eq!(value["error"]["code"], json!(-32601));
}

#[test]
fn rpc_request_defaults_params_to_null_when_absent() {
    let req: RpcRequest = serde_json::from_str(
        r#"{"jsonrpc":"2.0","id":1,"method":"session.list"}"#,
    )
    .unwrap();
    assert_eq!(req.params, serde_json::Value::Null);
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_message_is_displayed_for_model_errors() {
    let e = Error::model("502, body-prefix");
    assert_eq!(e.message(), "ModelError(502, body-prefix)");
}

#[test]
fn error_rpc_code_is_handler_error_for_all_kinds() {
    for e in [
        Error::validation("bad"),
        Error::not_found("Agent not found"),
        Error::model("missing content"),
        Error::policy("Routing depth exceeded"),
        Error::store("duplicate key"),
    ] {
        assert_eq!(e.rpc_code(), -32000);
    }
}
