mod loader;
mod schema;

pub use loader::{finalize, load_config};
pub use schema::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal startup conditions. The gateway refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "MODELS, OPENAI_BASE_URLS, OPENAI_KEYS must have the same length \
         (got {models}, {base_urls}, {keys})"
    )]
    MismatchedBackends {
        models: usize,
        base_urls: usize,
        keys: usize,
    },

    #[error("no backend models configured")]
    NoBackends,

    #[error("default model '{0}' is not one of the configured models")]
    UnknownDefaultModel(String),

    #[error("prompt template not found: {}", .0.display())]
    MissingTemplate(PathBuf),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        loader::load_config(path)
    }

    /// Built-in defaults plus environment overrides, for running without a
    /// config file.
    pub fn from_env() -> Result<Self> {
        loader::finalize(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".toolshim").join("config.yaml"))
    }
}

impl BackendsConfig {
    /// Effective default model: the explicit setting, else the first model.
    pub fn default_model_id(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(String::as_str))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.len() != self.base_urls.len() || self.models.len() != self.keys.len() {
            return Err(ConfigError::MismatchedBackends {
                models: self.models.len(),
                base_urls: self.base_urls.len(),
                keys: self.keys.len(),
            });
        }

        if self.models.is_empty() {
            return Err(ConfigError::NoBackends);
        }

        if let Some(default) = self.default_model_id() {
            if !self.models.iter().any(|m| m == default) {
                return Err(ConfigError::UnknownDefaultModel(default.to_string()));
            }
        }

        Ok(())
    }
}
