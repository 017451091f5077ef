use orc_core::RoutingHints;
use orc_routing::merge_unique;
use orc_routing::normalize_strings;
use serde_json::Value;

/// A plan's `agentsToCreate[i]`, parsed out of an opaque model-response
/// value (§9 dynamic JSON payloads) into the fields the resolver needs.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub resources: Vec<Value>,
    pub io_schema: Option<Value>,
    pub routing_hints: RoutingHints,
    pub metadata_tags: Vec<String>,
}

fn str_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("").trim().to_string()
}

fn str_array_field(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default()
}

impl AgentSpec {
    /// Agent spec validity (§4.5.5 step 7): non-empty `slug`, `name`,
    /// `systemPrompt`.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let slug = str_field(value, "slug");
        let name = str_field(value, "name");
        let system_prompt = value.get("systemPrompt").and_then(|v| v.as_str()).unwrap_or("").to_string();
        if slug.is_empty() || name.is_empty() || system_prompt.trim().is_empty() {
            return Err("Agent spec missing required slug/name/systemPrompt".to_string());
        }

        let description = value.get("description").and_then(|v| v.as_str()).map(|s| s.to_string());
        let resources = value.get("resources").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let io_schema = value.get("ioSchema").cloned();

        let routing_hints_tags = value.get("routingHints").map(|rh| str_array_field(rh, "tags")).unwrap_or_default();
        let preferred_model = value
            .get("routingHints")
            .and_then(|rh| rh.get("preferredModel"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let temperature = value
            .get("routingHints")
            .and_then(|rh| rh.get("temperature"))
            .and_then(|v| v.as_f64());

        let metadata_tags = value.get("metadata").map(|m| str_array_field(m, "tags")).unwrap_or_default();

        Ok(AgentSpec {
            slug,
            name,
            description,
            system_prompt,
            resources,
            io_schema,
            routing_hints: RoutingHints { tags: routing_hints_tags, preferred_model, temperature },
            metadata_tags,
        })
    }

    /// `normalize(routingHints.tags) ∪ normalize(metadata.tags)` (§4.4).
    pub fn effective_tags(&self) -> Vec<String> {
        merge_unique(&normalize_strings(&self.routing_hints.tags), &normalize_strings(&self.metadata_tags))
    }
}
