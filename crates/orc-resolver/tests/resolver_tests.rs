use orc_resolver::{resolve_agent, AgentSpec, ResolverContext};
use orc_store::{InMemoryStore, Store};
use serde_json::json;

fn ctx() -> ResolverContext {
    ResolverContext {
        parent_run_id: Some("run-parent".into()),
        root_run_id: "run-root".into(),
        created_by_agent_id: Some("agent-caller".into()),
        user_message: "Plan a demo".into(),
    }
}

fn spec_value(slug: &str, prompt: &str, tags: &[&str]) -> serde_json::Value {
    json!({
        "slug": slug,
        "name": format!("{slug} name"),
        "systemPrompt": prompt,
        "metadata": { "tags": tags },
    })
}

// ===========================================================================
// Agent spec parsing / validity
// ===========================================================================

#[test]
fn agent_spec_parse_rejects_empty_system_prompt() {
    let value = json!({"slug": "a", "name": "A", "systemPrompt": ""});
    assert!(AgentSpec::parse(&value).is_err());
}

#[test]
fn agent_spec_effective_tags_merges_routing_hints_and_metadata() {
    let value = json!({
        "slug": "a", "name": "A", "systemPrompt": "p",
        "routingHints": {"tags": ["alpha"]},
        "metadata": {"tags": ["beta", "alpha"]},
    });
    let spec = AgentSpec::parse(&value).unwrap();
    assert_eq!(spec.effective_tags(), vec!["alpha".to_string(), "beta".to_string()]);
}

// ===========================================================================
// No match -> new agent + version 1
// ===========================================================================

#[tokio::test]
async fn no_match_creates_new_agent_with_version_one() {
    let store = InMemoryStore::new();
    let spec = AgentSpec::parse(&spec_value("mock-echo", "you echo things", &["specialist"])).unwrap();
    let resolution = resolve_agent(&store, &spec, &ctx()).await.unwrap();

    assert_eq!(resolution.created_new_agent, Some(true));
    assert!(resolution.matched_on.is_none());
    assert!(!resolution.reused);

    let agent = store.get_agent(&resolution.agent_id).await.unwrap().unwrap();
    assert_eq!(agent.slug, "mock-echo");
    let version = store.get_agent_version(&resolution.agent_version_id).await.unwrap().unwrap();
    assert_eq!(version.version, 1);
    assert_eq!(agent.metadata.role.unwrap().as_str(), "specialist");
    assert!(agent.metadata.origin.is_some());
    assert!(agent.metadata.card.is_some());
}

// ===========================================================================
// Dedup by slug, identical prompt -> reuse, no new version
// ===========================================================================

#[tokio::test]
async fn identical_prompt_reuses_without_new_version() {
    let store = InMemoryStore::new();
    let spec = AgentSpec::parse(&spec_value("mock-echo", "you echo things", &["specialist"])).unwrap();
    let first = resolve_agent(&store, &spec, &ctx()).await.unwrap();

    let second = resolve_agent(&store, &spec, &ctx()).await.unwrap();
    assert!(second.reused);
    assert_eq!(second.matched_on.as_deref(), Some("slug"));
    assert_eq!(second.agent_version_id, first.agent_version_id);

    let agent = store.get_agent(&second.agent_id).await.unwrap().unwrap();
    assert!(store.latest_agent_version(&agent.id).await.unwrap().unwrap().version == 1);
}

// ===========================================================================
// Dedup by slug, differing prompt -> new version appended
// ===========================================================================

#[tokio::test]
async fn differing_prompt_appends_new_version() {
    let store = InMemoryStore::new();
    let spec_v1 = AgentSpec::parse(&spec_value("mock-echo", "you echo things", &[])).unwrap();
    let first = resolve_agent(&store, &spec_v1, &ctx()).await.unwrap();

    let spec_v2 = AgentSpec::parse(&spec_value("mock-echo", "you echo things, politely", &[])).unwrap();
    let second = resolve_agent(&store, &spec_v2, &ctx()).await.unwrap();

    assert_eq!(second.matched_on.as_deref(), Some("slug-updated"));
    assert_eq!(second.created_new_version, Some(true));
    assert_ne!(second.agent_version_id, first.agent_version_id);

    let latest = store.latest_agent_version(&second.agent_id).await.unwrap().unwrap();
    assert_eq!(latest.version, 2);
    let agent = store.get_agent(&second.agent_id).await.unwrap().unwrap();
    assert_eq!(agent.active_version_id, latest.id);
}

// ===========================================================================
// Dedup by tag when slug/name don't match
// ===========================================================================

#[tokio::test]
async fn tag_intersection_matches_existing_agent() {
    let store = InMemoryStore::new();
    let existing_spec = AgentSpec::parse(&spec_value("billing-helper", "help with billing", &["alpha"])).unwrap();
    resolve_agent(&store, &existing_spec, &ctx()).await.unwrap();

    let new_spec_value = json!({
        "slug": "x-helper",
        "name": "X Helper",
        "systemPrompt": "help with billing",
        "metadata": { "tags": ["alpha"] },
    });
    let new_spec = AgentSpec::parse(&new_spec_value).unwrap();
    let resolution = resolve_agent(&store, &new_spec, &ctx()).await.unwrap();

    assert_eq!(resolution.matched_on.as_deref(), Some("tags"));
    assert_eq!(resolution.slug, "billing-helper");
    assert_eq!(resolution.requested_slug, "x-helper");
}
