use async_trait::async_trait;
use serde_json::json;

use crate::error::ModelError;
use crate::provider::ModelCaller;
use crate::request::{ModelRequest, ModelResponse};

const FINAL_MARKER: &str = "final only";

/// In-process provider used when no model credentials are configured.
/// Produces a canned plan by default, or a canned final result when the
/// user content contains the marker `"final only"` (§4.2).
#[derive(Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    fn canned_final(user_content: &str) -> String {
        let echo = user_content
            .split("\n\nContext:")
            .next()
            .unwrap_or(user_content)
            .trim();
        json!({
            "type": "final",
            "result": { "mock": true, "echo": echo },
        })
        .to_string()
    }

    fn canned_plan() -> String {
        json!({
            "type": "plan",
            "agentsToCreate": [{
                "slug": "mock-echo",
                "name": "Mock Echo",
                "systemPrompt": "You are a mock echo specialist agent used for offline testing.",
                "metadata": { "tags": ["specialist"] },
            }],
            "runsToExecute": [{ "slug": "mock-echo", "userMessage": "echo this" }],
        })
        .to_string()
    }
}

#[async_trait]
impl ModelCaller for MockProvider {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let user_content = request.user_content().to_string();
        let content = if user_content.contains(FINAL_MARKER) {
            Self::canned_final(&user_content)
        } else {
            Self::canned_plan()
        };
        Ok(ModelResponse { content })
    }
}
