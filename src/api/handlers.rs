use super::{ApiError, AppState};
use crate::core::{AnswerResponse, SourceRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `POST /v1/messages`
///
/// The authorization header must be present; its value is not checked.
/// It is tested before the body is parsed so an unauthenticated request
/// never reaches a backend.
pub async fn messages_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnswerResponse>, ApiError> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .map(|value| !value.as_bytes().is_empty())
        .unwrap_or(false);
    if !authorized {
        return Err(ApiError::Unauthorized(
            "missing authorization header".to_string(),
        ));
    }

    let request: SourceRequest = serde_json::from_slice(&body)?;
    let response = state
        .gateway
        .handle_with_body(request, &String::from_utf8_lossy(&body))
        .await?;
    Ok(Json(response))
}
