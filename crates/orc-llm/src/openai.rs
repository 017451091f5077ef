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

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), api_key: api_key.into(), base_url: base_url.into() }
    }
}

#[async_trait]
impl ModelCaller for OpenAiProvider {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "response_format": { "type": "json_object" },
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
