//! Pure routing utilities: no I/O, no async. Agent-summary derivation,
//! router/specialist indexes, routing-state parsing, result summarization.

use orc_core::{Agent, Role};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Non-empty, trimmed strings only, in original order.
pub fn normalize_strings<I, S>(v: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    v.into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Stable-order deduplicated union of two string sequences.
pub fn merge_unique(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    for s in a.iter().chain(b.iter()) {
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    out
}

/// Router precedence beats specialist when both tags are present.
pub fn infer_role_from_tags(tags: &[String]) -> Option<Role> {
    let has = |needle: &str| tags.iter().any(|t| t.eq_ignore_ascii_case(needle));
    if has("router") || has("domain-router") {
        Some(Role::Router)
    } else if has("specialist") {
        Some(Role::Specialist)
    } else {
        None
    }
}

/// Domains declared via `domain:<name>` tags, normalized.
pub fn extract_domains_from_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|t| t.strip_prefix("domain:"))
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

const SLUG_SUFFIXES: &[&str] = &["_router", "-router", "_specialist", "-specialist"];
const NAME_SUFFIXES: &[&str] = &[" router", " specialist"];

/// Best-effort domain guess from an agent's name/slug when no explicit
/// `domain:` tag is present.
pub fn infer_domain_from_label(name: &str, slug: &str) -> String {
    let lower_slug = slug.to_lowercase();
    for suffix in SLUG_SUFFIXES {
        if lower_slug.ends_with(suffix) {
            return lower_slug[..lower_slug.len() - suffix.len()].to_string();
        }
    }
    let lower_name = name.to_lowercase();
    for suffix in NAME_SUFFIXES {
        if lower_name.ends_with(suffix) {
            return lower_name[..lower_name.len() - suffix.len()].to_string();
        }
    }
    lower_slug
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub domains: Vec<String>,
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub system: bool,
    pub hidden: bool,
}

/// Metadata wins; inference only fills gaps metadata left empty.
pub fn build_agent_summary(agent: &Agent) -> AgentSummary {
    let tags = agent.metadata.tags.clone();
    let role = agent
        .metadata
        .role
        .map(|r| r.as_str().to_string())
        .or_else(|| infer_role_from_tags(&tags).map(|r| r.as_str().to_string()));
    let domains = if !agent.metadata.domains.is_empty() {
        agent.metadata.domains.clone()
    } else {
        let from_tags = extract_domains_from_tags(&tags);
        if !from_tags.is_empty() {
            from_tags
        } else {
            vec![infer_domain_from_label(&agent.name, &agent.slug)]
        }
    };
    AgentSummary {
        slug: agent.slug.clone(),
        name: agent.name.clone(),
        description: agent.description.clone(),
        tags,
        domains,
        capabilities: agent.metadata.capabilities.clone(),
        role,
        system: agent.metadata.system,
        hidden: agent.metadata.hidden,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub domains: Vec<String>,
    pub tags: Vec<String>,
}

impl From<&AgentSummary> for IndexEntry {
    fn from(s: &AgentSummary) -> Self {
        IndexEntry {
            slug: s.slug.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            domains: s.domains.clone(),
            tags: s.tags.clone(),
        }
    }
}

/// First `limit` non-hidden router agents, in input order.
pub fn build_router_index(agents: &[Agent], limit: usize) -> Vec<IndexEntry> {
    agents
        .iter()
        .map(build_agent_summary)
        .filter(|s| !s.hidden && s.role.as_deref() == Some("router"))
        .take(limit)
        .map(|s| IndexEntry::from(&s))
        .collect()
}

/// Non-hidden specialist agents, optionally restricted to the given domains.
pub fn build_specialist_index(agents: &[Agent], limit: usize, domains: &[String]) -> Vec<IndexEntry> {
    agents
        .iter()
        .map(build_agent_summary)
        .filter(|s| !s.hidden && s.role.as_deref() == Some("specialist"))
        .filter(|s| domains.is_empty() || s.domains.iter().any(|d| domains.contains(d)))
        .take(limit)
        .map(|s| IndexEntry::from(&s))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsSummary {
    pub total: usize,
    pub by_domain: HashMap<String, usize>,
    pub by_role: HashMap<String, usize>,
    pub top_tags: Vec<(String, usize)>,
}

pub fn summarize_agents(agents: &[Agent]) -> AgentsSummary {
    let summaries: Vec<AgentSummary> = agents.iter().map(build_agent_summary).collect();
    let mut by_domain: HashMap<String, usize> = HashMap::new();
    let mut by_role: HashMap<String, usize> = HashMap::new();
    let mut tag_counts: HashMap<String, usize> = HashMap::new();
    for s in &summaries {
        for d in &s.domains {
            *by_domain.entry(d.clone()).or_insert(0) += 1;
        }
        let role = s.role.clone().unwrap_or_else(|| "unknown".to_string());
        *by_role.entry(role).or_insert(0) += 1;
        for t in &s.tags {
            *tag_counts.entry(t.clone()).or_insert(0) += 1;
        }
    }
    let mut top_tags: Vec<(String, usize)> = tag_counts.into_iter().collect();
    top_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_tags.truncate(12);
    AgentsSummary { total: summaries.len(), by_domain, by_role, top_tags }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingState {
    pub visited_slugs: Vec<String>,
    pub routing_depth: u32,
}

/// Parses `context.routingState`; non-numeric depth becomes 0, negative
/// clamps to 0.
pub fn read_routing_state(context: &Value) -> RoutingState {
    let state = context.get("routingState");
    let visited_slugs = state
        .and_then(|s| s.get("visitedSlugs"))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let routing_depth = state
        .and_then(|s| s.get("routingDepth"))
        .and_then(|v| v.as_i64())
        .map(|v| v.max(0) as u32)
        .unwrap_or(0);
    RoutingState { visited_slugs, routing_depth }
}

const MAX_STRING_LEN: usize = 200;
const MAX_OBJECT_KEYS: usize = 20;

fn truncate_string(s: &str) -> Value {
    let char_count = s.chars().count();
    if char_count > MAX_STRING_LEN {
        let head: String = s.chars().take(MAX_STRING_LEN - 1).collect();
        json!(format!("{head}\u{2026}"))
    } else {
        json!(s)
    }
}

fn is_array_summary(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.get("type").and_then(|t| t.as_str()) == Some("array") && map.contains_key("length")
}

fn is_object_summary(map: &Map<String, Value>) -> bool {
    map.len() == 3
        && map.get("type").and_then(|t| t.as_str()) == Some("object")
        && map.contains_key("keys")
        && map.contains_key("truncated")
}

/// Truncates strings, collapses arrays/objects to a shape descriptor.
/// Idempotent: summarizing an already-summarized value returns it unchanged.
pub fn summarize_result(value: &Value) -> Value {
    match value {
        Value::String(s) => truncate_string(s),
        Value::Array(arr) => json!({ "type": "array", "length": arr.len() }),
        Value::Object(map) => {
            if is_array_summary(map) || is_object_summary(map) {
                return value.clone();
            }
            let keys: Vec<String> = map.keys().take(MAX_OBJECT_KEYS).cloned().collect();
            let truncated = map.len() > MAX_OBJECT_KEYS;
            json!({ "type": "object", "keys": keys, "truncated": truncated })
        }
        other => other.clone(),
    }
}
