use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>, temperature: f64) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system.into() },
                ChatMessage { role: "user".to_string(), content: user.into() },
            ],
            temperature,
        }
    }

    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
}
