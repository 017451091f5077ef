use thiserror::Error;

/// Error kinds recognized by the engine. Variants map 1:1 onto the error
/// kinds in the error handling design: ValidationError, NotFound, ModelError,
/// PolicyError, ChildFailure, TransientStoreError.
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("ModelError({0})")]
    Model(String),

    #[error("{0}")]
    Policy(String),

    #[error("{0}")]
    Store(String),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Error::Policy(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// The message carried by this error, used as both the run's
    /// `error.message` and the RPC error's `message` field.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// JSON-RPC error code for this kind, per the RPC surface (-32000 for
    /// handler failures, -32601 is reserved for unknown method at dispatch).
    pub fn rpc_code(&self) -> i32 {
        -32000
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Validation(format!("invalid JSON: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
