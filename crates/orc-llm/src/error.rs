use thiserror::Error;

/// Failure modes of the model caller (§4.2). `Display` renders exactly the
/// strings the run boundary wraps as `ModelError(...)`.
#[derive(Debug, Error, Clone)]
pub enum ModelError {
    #[error("{status}, {body_prefix}")]
    Http { status: u16, body_prefix: String },

    #[error("missing content")]
    MissingContent,

    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        ModelError::Request(e.to_string())
    }
}

impl From<ModelError> for orc_core::Error {
    fn from(e: ModelError) -> Self {
        orc_core::Error::model(e.to_string())
    }
}
