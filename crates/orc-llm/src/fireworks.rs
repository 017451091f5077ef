use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::ModelError;
use crate::provider::{http_error, ModelCaller};
use crate::request::{ModelRequest, ModelResponse};

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Fireworks exposes an OpenAI-compatible chat-completions endpoint; request
/// shape mirrors `OpenAiProvider` minus the forced JSON response format.
///
/// Fireworks does not accept OpenAI model ids, so `model_override` (from
/// `FIREWORKS_MODEL`, §6) replaces `request.model` when set; absent it, the
/// request's own model name is sent as-is.
pub struct FireworksProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model_override: Option<String>,
}

impl FireworksProvider {
    pub fn new(api_key: impl Into<String>, model_override: Option<String>) -> Self {
        Self::with_base_url(api_key, "https://api.fireworks.ai/inference/v1", model_override)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>, model_override: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), api_key: api_key.into(), base_url: base_url.into(), model_override }
    }
}

#[async_trait]
impl ModelCaller for FireworksProvider {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let model = self.model_override.as_deref().unwrap_or(&request.model);
        let body = json!({
            "model": model,
            "messages": request.messages,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(http_error(status, &text));
        }

        let parsed: ChatCompletion = serde_json::from_str(&text).map_err(|_| ModelError::MissingContent)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ModelError::MissingContent)?;

        Ok(ModelResponse { content })
    }
}
