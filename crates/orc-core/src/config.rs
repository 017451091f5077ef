//! Environment-variable-driven configuration, read once at process startup.

use std::env;

fn parse_positive_u32(var: &str, default: u32) -> u32 {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => default,
        },
        Err(_) => default,
    }
}

fn parse_positive_u16(var: &str, default: u16) -> u16 {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<u16>() {
            Ok(v) if v > 0 => v,
            _ => default,
        },
        Err(_) => default,
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Routing and policy limits enforced by the Run Executor (§4.5.5, §9).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_depth: u32,
    pub max_children: u32,
    pub router_index_limit: usize,
    pub specialist_index_limit: usize,
    pub main_router_slug: String,
    pub main_router_name: String,
    pub spawn_cap: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_children: 3,
            router_index_limit: 50,
            specialist_index_limit: 50,
            main_router_slug: "bootstrap".to_string(),
            main_router_name: "Bootstrap Router".to_string(),
            spawn_cap: 10,
        }
    }
}

impl ExecutorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_depth: parse_positive_u32("A2A_MAX_DEPTH", defaults.max_depth),
            max_children: parse_positive_u32("A2A_MAX_CHILDREN", defaults.max_children),
            router_index_limit: parse_positive_u32(
                "A2A_ROUTER_INDEX_LIMIT",
                defaults.router_index_limit as u32,
            ) as usize,
            specialist_index_limit: parse_positive_u32(
                "A2A_SPECIALIST_INDEX_LIMIT",
                defaults.specialist_index_limit as u32,
            ) as usize,
            main_router_slug: non_empty("MAIN_ROUTER_SLUG").unwrap_or(defaults.main_router_slug),
            main_router_name: non_empty("MAIN_ROUTER_NAME").unwrap_or(defaults.main_router_name),
            spawn_cap: defaults.spawn_cap,
        }
    }
}

/// Model-caller configuration: credentials and model names (§4.2, §6).
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_name: String,
    pub openai_api_key: Option<String>,
    pub fireworks_api_key: Option<String>,
    pub fireworks_model: Option<String>,
}

impl ModelConfig {
    pub fn from_env() -> Self {
        Self {
            model_name: non_empty("MODEL_NAME").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            fireworks_api_key: non_empty("FIREWORKS_API_KEY"),
            fireworks_model: non_empty("FIREWORKS_MODEL"),
        }
    }
}

/// Store connection parameters. The in-scope store implementation is
/// in-process, so these are accepted and logged but do not gate startup.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub uri: Option<String>,
    pub database: Option<String>,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            uri: non_empty("STORE_URI"),
            database: non_empty("STORE_DATABASE"),
        }
    }
}

/// Gateway bind configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: 4000 }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self { port: parse_positive_u16("PORT", Self::default().port) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_config_defaults_when_unset() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.max_depth, 2);
        assert_eq!(cfg.max_children, 3);
        assert_eq!(cfg.router_index_limit, 50);
        assert_eq!(cfg.specialist_index_limit, 50);
        assert_eq!(cfg.spawn_cap, 10);
    }

    #[test]
    fn parse_positive_u32_rejects_zero_and_garbage() {
        assert_eq!(parse_positive_u32("ORC_TEST_DOES_NOT_EXIST", 7), 7);
    }

    #[test]
    fn gateway_config_default_port() {
        assert_eq!(GatewayConfig::default().port, 4000);
    }
}
