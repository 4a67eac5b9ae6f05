use super::{Config, ConfigError};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    finalize(config)
}

/// Apply environment overrides and validate.
pub fn finalize(config: Config) -> Result<Config> {
    let config = apply_env_overrides(config, |name| std::env::var(name).ok())?;
    let config = substitute_env_vars(config, |name| std::env::var(name).ok());

    validate_config(&config)?;

    Ok(config)
}

/// Environment variables take precedence over the config file:
/// `MODELS`, `OPENAI_BASE_URLS` and `OPENAI_KEYS` are comma separated and
/// positional, `DEFAULT_MODEL`, `DEBUG`, `HOST` and `PORT` are scalars.
pub(crate) fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(models) = lookup("MODELS") {
        config.backends.models = split_list(&models);
    }
    if let Some(urls) = lookup("OPENAI_BASE_URLS") {
        config.backends.base_urls = split_list(&urls);
    }
    if let Some(keys) = lookup("OPENAI_KEYS") {
        config.backends.keys = split_list(&keys);
    }
    if let Some(model) = lookup("DEFAULT_MODEL").filter(|m| !m.is_empty()) {
        config.backends.default_model = Some(model);
    }
    if let Some(debug) = lookup("DEBUG") {
        config.debug.enabled = debug == "true";
    }
    if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
        config.gateway.host = host;
    }
    if let Some(port) = lookup("PORT") {
        config.gateway.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            var: "PORT",
            value: port.clone(),
        })?;
    }

    Ok(config)
}

/// Resolve `${VAR}` references in backend credentials.
fn substitute_env_vars<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    for key in config.backends.keys.iter_mut() {
        if key.starts_with("${") && key.ends_with('}') {
            let var_name = &key[2..key.len() - 1];
            *key = lookup(var_name).unwrap_or_default();
        }
    }

    config
}

fn split_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(',').map(|s| s.trim().to_string()).collect()
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.backends.validate()?;

    if config.cache.max_entries == Some(0) {
        return Err(ConfigError::Invalid(
            "cache.max_entries must be greater than zero".to_string(),
        ));
    }

    let valid_formats = ["pretty", "compact", "json"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "Invalid logging format: {}",
            config.logging.format
        )));
    }

    Ok(())
}
