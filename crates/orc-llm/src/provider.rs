use async_trait::async_trait;

use crate::error::ModelError;
use crate::request::{ModelRequest, ModelResponse};

#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}

fn body_prefix(body: &str) -> String {
    body.chars().take(200).collect()
}

pub(crate) fn http_error(status: reqwest::StatusCode, body: &str) -> ModelError {
    ModelError::Http { status: status.as_u16(), body_prefix: body_prefix(body) }
}
