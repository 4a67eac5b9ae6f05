use crate::llm::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend answered with a non-success status.
    #[error("{body}")]
    Upstream { status: u16, body: String },

    /// No usable answer could be recovered from the backend reply.
    #[error("parse failed : {content}")]
    ParseFailed { content: String },

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, body } => Self::Upstream { status, body },
            other => Self::Backend(other),
        }
    }
}
