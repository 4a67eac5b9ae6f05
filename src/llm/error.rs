use thiserror::Error;

/// Body text used when an upstream error body cannot be read.
pub const UNKNOWN_ERROR_BODY: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum BackendError {
    /// Non-success HTTP status from the backend.
    #[error("{body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid completion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to build completion request: {0}")]
    Build(#[from] async_openai::error::OpenAIError),
}
