pub mod error;
pub mod handlers;

use crate::core::Gateway;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router as AxumRouter;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub use error::ApiError;
pub use handlers::HealthResponse;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// Build the Axum router: `POST /v1/messages` and `GET /health`.
pub fn build_router(state: AppState, max_body_bytes: usize) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(handlers::health_handler))
        .route("/v1/messages", post(handlers::messages_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(logging_middleware))
}

/// HTTP front end of the gateway
pub struct ApiServer {
    gateway: Arc<Gateway>,
    host: String,
    port: u16,
    max_body_bytes: usize,
}

impl ApiServer {
    pub fn new(gateway: Arc<Gateway>, host: String, port: u16, max_body_bytes: usize) -> Self {
        Self {
            gateway,
            host,
            port,
            max_body_bytes,
        }
    }

    /// Start the server
    pub async fn start(&self) -> Result<()> {
        let app = build_router(
            AppState {
                gateway: self.gateway.clone(),
            },
            self.max_body_bytes,
        );
        let addr = format!("{}:{}", self.host, self.port);

        info!("Listening on {} (Health: /health, Messages: /v1/messages)", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .context("Failed to bind server")?;

        axum::serve(listener, app).await.context("Server error")?;

        Ok(())
    }
}

/// Logging middleware
async fn logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    tracing::info!(
        "{} {} -> {} ({} ms)",
        method,
        uri,
        status,
        started.elapsed().as_millis()
    );

    response
}
