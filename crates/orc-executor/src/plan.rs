//! Plan parsing and validation (§4.5.5). A plan is an opaque JSON object
//! (§9 dynamic JSON payloads); only `type`, `agentsToCreate`/`agents` and
//! `runsToExecute`/`runs` are structurally required.

use orc_core::{Error, Result};
use serde_json::Value;

/// One entry of `runsToExecute` (§4.5.6).
#[derive(Debug, Clone)]
pub struct ChildRunSpec {
    pub slug: String,
    pub user_message: Option<String>,
    pub context: Option<Value>,
}

impl ChildRunSpec {
    fn parse(value: &Value) -> Result<Self> {
        let slug = value.get("slug").and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
        if slug.is_empty() {
            return Err(Error::validation("runsToExecute entry missing non-empty slug"));
        }
        let user_message = value.get("userMessage").and_then(|v| v.as_str()).map(|s| s.to_string());
        let context = value.get("context").cloned();
        Ok(Self { slug, user_message, context })
    }
}

/// A parsed `{"type":"plan",...}` model response (§4.5.5).
#[derive(Debug, Clone)]
pub struct Plan {
    /// The full, unmodified parsed response — becomes `parentPlan` for children (§4.5.6).
    pub raw: Value,
    pub agents_to_create: Vec<Value>,
    pub runs_to_execute: Vec<ChildRunSpec>,
}

fn array_or_legacy<'a>(parsed: &'a Value, key: &str, legacy_key: &str) -> Result<&'a [Value]> {
    let primary = parsed.get(key);
    let legacy = parsed.get(legacy_key);
    let chosen = match (primary, legacy) {
        (Some(Value::Array(a)), _) => Some(a.as_slice()),
        (None, Some(Value::Array(a))) => Some(a.as_slice()),
        (Some(Value::Null), Some(Value::Array(a))) => Some(a.as_slice()),
        (None, None) => Some(&[][..]),
        (Some(Value::Null), None) => Some(&[][..]),
        _ => None,
    };
    chosen.ok_or_else(|| Error::validation(format!("Model plan field '{key}' is not an array")))
}

impl Plan {
    /// Parses legacy key aliases (§9 Legacy key aliases): `agents` for
    /// `agentsToCreate`, `runs` for `runsToExecute`.
    pub fn parse(parsed: &Value) -> Result<Self> {
        let agents_to_create: Vec<Value> = array_or_legacy(parsed, "agentsToCreate", "agents")?.to_vec();
        let runs_raw = array_or_legacy(parsed, "runsToExecute", "runs")?;
        let runs_to_execute = runs_raw.iter().map(ChildRunSpec::parse).collect::<Result<Vec<_>>>()?;

        Ok(Self { raw: parsed.clone(), agents_to_create, runs_to_execute })
    }
}

/// Role-discipline, depth, fan-out, uniqueness, anti-loop and spawn-cap
/// checks, applied in the order given by §4.5.5.
pub struct PlanValidation<'a> {
    pub plan: &'a Plan,
    pub running_role: Option<&'a str>,
    pub known_routers: &'a [String],
    pub routing_depth: u32,
    pub max_depth: u32,
    pub max_children: u32,
    pub visited_slugs: &'a [String],
    pub already_spawned: usize,
    pub spawn_cap: u32,
}

impl<'a> PlanValidation<'a> {
    pub fn validate(&self) -> Result<()> {
        self.role_discipline()?;
        self.depth_limit()?;
        self.fan_out_limit()?;
        self.per_run_uniqueness()?;
        self.anti_loop()?;
        self.spawn_cap_check()?;
        self.agent_spec_validity()?;
        Ok(())
    }

    fn role_discipline(&self) -> Result<()> {
        if self.running_role != Some("specialist") {
            return Ok(());
        }
        if !self.plan.agents_to_create.is_empty() {
            return Err(Error::policy("Specialist agents cannot create new agents"));
        }
        if self.plan.runs_to_execute.len() > 1 {
            return Err(Error::policy("Specialist agents may delegate to at most one router"));
        }
        for child in &self.plan.runs_to_execute {
            if !self.known_routers.iter().any(|r| r == &child.slug) {
                return Err(Error::policy(format!(
                    "Specialist agents may only delegate to a known router: {}",
                    child.slug
                )));
            }
        }
        Ok(())
    }

    fn depth_limit(&self) -> Result<()> {
        if self.routing_depth >= self.max_depth && !self.plan.runs_to_execute.is_empty() {
            return Err(Error::policy("Routing depth exceeded"));
        }
        Ok(())
    }

    fn fan_out_limit(&self) -> Result<()> {
        if self.plan.runs_to_execute.len() as u32 > self.max_children {
            return Err(Error::policy("Fan-out limit exceeded"));
        }
        Ok(())
    }

    fn per_run_uniqueness(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for child in &self.plan.runs_to_execute {
            if !seen.insert(child.slug.as_str()) {
                return Err(Error::validation(format!("Duplicate slug in plan: {}", child.slug)));
            }
        }
        Ok(())
    }

    fn anti_loop(&self) -> Result<()> {
        for child in &self.plan.runs_to_execute {
            if self.visited_slugs.iter().any(|s| s == &child.slug) {
                return Err(Error::policy(format!("Slug already executed in this run tree: {}", child.slug)));
            }
        }
        Ok(())
    }

    fn spawn_cap_check(&self) -> Result<()> {
        let requested = self.plan.runs_to_execute.len();
        if self.already_spawned + requested > self.spawn_cap as usize {
            return Err(Error::policy("Spawn cap exceeded"));
        }
        Ok(())
    }

    fn agent_spec_validity(&self) -> Result<()> {
        for spec in &self.plan.agents_to_create {
            let slug = spec.get("slug").and_then(|v| v.as_str()).unwrap_or("").trim();
            let name = spec.get("name").and_then(|v| v.as_str()).unwrap_or("").trim();
            let prompt = spec.get("systemPrompt").and_then(|v| v.as_str()).unwrap_or("").trim();
            if slug.is_empty() || name.is_empty() || prompt.is_empty() {
                return Err(Error::validation("Agent spec missing required slug/name/systemPrompt"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_plan(runs: Vec<Value>) -> Plan {
        Plan::parse(&json!({ "type": "plan", "runsToExecute": runs })).unwrap()
    }

    #[test]
    fn parses_legacy_agents_and_runs_keys() {
        let plan = Plan::parse(&json!({
            "type": "plan",
            "agents": [{"slug": "a", "name": "A", "systemPrompt": "p"}],
            "runs": [{"slug": "a"}],
        }))
        .unwrap();
        assert_eq!(plan.agents_to_create.len(), 1);
        assert_eq!(plan.runs_to_execute.len(), 1);
    }

    #[test]
    fn depth_at_max_with_empty_runs_succeeds() {
        let plan = base_plan(vec![]);
        let v = PlanValidation {
            plan: &plan,
            running_role: None,
            known_routers: &[],
            routing_depth: 2,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        assert!(v.validate().is_ok());
    }

    #[test]
    fn depth_at_max_with_one_run_fails() {
        let plan = base_plan(vec![json!({"slug": "x"})]);
        let v = PlanValidation {
            plan: &plan,
            running_role: None,
            known_routers: &[],
            routing_depth: 2,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        let err = v.validate().unwrap_err();
        assert_eq!(err.message(), "Routing depth exceeded");
    }

    #[test]
    fn fan_out_at_limit_succeeds_over_limit_fails() {
        let at_limit = base_plan(vec![json!({"slug": "a"}), json!({"slug": "b"}), json!({"slug": "c"})]);
        let v = PlanValidation {
            plan: &at_limit,
            running_role: None,
            known_routers: &[],
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        assert!(v.validate().is_ok());

        let over_limit = base_plan(vec![json!({"slug": "a"}), json!({"slug": "b"}), json!({"slug": "c"}), json!({"slug": "d"})]);
        let v2 = PlanValidation { plan: &over_limit, ..v };
        assert!(v2.validate().is_err());
    }

    #[test]
    fn specialist_cannot_create_agents() {
        let plan = Plan::parse(&json!({
            "type": "plan",
            "agentsToCreate": [{"slug": "a", "name": "A", "systemPrompt": "p"}],
            "runsToExecute": [],
        }))
        .unwrap();
        let v = PlanValidation {
            plan: &plan,
            running_role: Some("specialist"),
            known_routers: &[],
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        let err = v.validate().unwrap_err();
        assert_eq!(err.message(), "Specialist agents cannot create new agents");
    }

    #[test]
    fn specialist_can_only_call_known_router() {
        let plan = base_plan(vec![json!({"slug": "billing-router"})]);
        let routers = vec!["billing-router".to_string()];
        let v = PlanValidation {
            plan: &plan,
            running_role: Some("specialist"),
            known_routers: &routers,
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        assert!(v.validate().is_ok());

        let bad_plan = base_plan(vec![json!({"slug": "not-a-router"})]);
        let v2 = PlanValidation { plan: &bad_plan, ..v };
        assert!(v2.validate().is_err());
    }

    #[test]
    fn anti_loop_rejects_visited_slug() {
        let plan = base_plan(vec![json!({"slug": "a"})]);
        let visited = vec!["a".to_string()];
        let v = PlanValidation {
            plan: &plan,
            running_role: None,
            known_routers: &[],
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &visited,
            already_spawned: 0,
            spawn_cap: 10,
        };
        let err = v.validate().unwrap_err();
        assert_eq!(err.message(), "Slug already executed in this run tree: a");
    }

    #[test]
    fn spawn_cap_blocks_when_exceeded() {
        let plan = base_plan(vec![json!({"slug": "a"})]);
        let v = PlanValidation {
            plan: &plan,
            running_role: None,
            known_routers: &[],
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 10,
            spawn_cap: 10,
        };
        let err = v.validate().unwrap_err();
        assert_eq!(err.message(), "Spawn cap exceeded");
    }

    #[test]
    fn duplicate_slug_within_plan_rejected() {
        let plan = base_plan(vec![json!({"slug": "a"}), json!({"slug": "a"})]);
        let v = PlanValidation {
            plan: &plan,
            running_role: None,
            known_routers: &[],
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        assert!(v.validate().is_err());
    }

    #[test]
    fn agent_spec_validity_rejects_blank_fields() {
        let plan = Plan::parse(&json!({
            "type": "plan",
            "agentsToCreate": [{"slug": "", "name": "A", "systemPrompt": "p"}],
        }))
        .unwrap();
        let v = PlanValidation {
            plan: &plan,
            running_role: None,
            known_routers: &[],
            routing_depth: 0,
            max_depth: 2,
            max_children: 3,
            visited_slugs: &[],
            already_spawned: 0,
            spawn_cap: 10,
        };
        assert!(v.validate().is_err());
    }
}
