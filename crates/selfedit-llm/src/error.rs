//! Error types for selfedit-llm

use selfedit_core::SelfEditError;
use thiserror::Error;

/// Errors raised while talking to an OpenAI-compatible endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key in the configured environment variable
    #[error("API key not set: export {0}")]
    MissingApiKey(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the server
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not contain the expected payload
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid `[llm]` configuration
    #[error("invalid llm config: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}

impl From<LlmError> for SelfEditError {
    fn from(err: LlmError) -> Self {
        match err {
            err @ (LlmError::Config(_) | LlmError::MissingApiKey(_)) => {
                SelfEditError::Config(err.to_string())
            }
            other => SelfEditError::collaborator(other),
        }
    }
}

/// Result type for selfedit-llm
pub type Result<T> = std::result::Result<T, LlmError>;
