use crate::core::GatewayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Unauthorized (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Backend answered with a non-success status, passed through as-is
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// No answer could be recovered from the backend reply (500)
    #[error("{0}")]
    ParseFailed(String),

    /// Internal server error (500)
    #[error("{0}")]
    InternalError(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::ParseFailed(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for JSON response
    pub fn error_code(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// Get error message
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::ParseFailed(msg)
            | Self::InternalError(msg) => msg.clone(),
            Self::Upstream { message, .. } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Upstream { status, body } => Self::Upstream {
                status,
                message: body,
            },
            err @ GatewayError::ParseFailed { .. } => Self::ParseFailed(err.to_string()),
            GatewayError::Backend(e) => {
                tracing::error!("Backend error: {}", e);
                Self::InternalError(e.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!("JSON error: {}", err);
        Self::BadRequest(format!("Invalid JSON: {}", err))
    }
}
