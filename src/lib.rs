pub mod api;
pub mod config;
pub mod core;
pub mod llm;

pub use config::Config;
pub use core::Gateway;

use anyhow::Result;
use std::sync::Arc;

/// Build the gateway from `config` and serve until the listener fails.
pub async fn run(config: Config) -> Result<()> {
    tracing::info!("Starting toolshim gateway...");

    let backend = Arc::new(llm::HttpBackend::new()?);
    let gateway = Gateway::from_config(&config, backend)?;

    for route in gateway.router().routes() {
        tracing::info!("Route: {} -> {}", route.model_id, route.base_url);
    }
    tracing::info!("Default model: {}", gateway.router().default_model());
    if config.debug.enabled {
        tracing::info!("Debug dumps enabled: {}", config.debug.dir.display());
    }

    let server = api::ApiServer::new(
        Arc::new(gateway),
        config.gateway.host.clone(),
        config.gateway.port,
        config.gateway.max_body_bytes,
    );
    server.start().await
}

/// Validate configuration and templates without serving. Returns the
/// routing table as printable lines.
pub fn check(config: &Config) -> Result<Vec<String>> {
    let router = llm::ModelRouter::new(&config.backends)?;
    core::PromptTemplates::load(&config.prompts)?;

    let mut lines: Vec<String> = router
        .routes()
        .map(|route| {
            let marker = if route.model_id == router.default_model() {
                " (default)"
            } else {
                ""
            };
            format!(
                "{} -> {} [{}]{}",
                route.model_id,
                route.base_url,
                route.masked_credential(),
                marker
            )
        })
        .collect();
    lines.push(format!(
        "templates: {}, {}",
        config.prompts.function_call_path().display(),
        config.prompts.fix_json_path().display()
    ));
    Ok(lines)
}
