use crate::config::{BackendsConfig, ConfigError};
use std::collections::HashMap;

/// Where requests for one model id are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingEntry {
    pub model_id: String,
    pub base_url: String,
    pub credential: String,
}

impl RoutingEntry {
    /// Credential with all but the first four characters hidden.
    pub fn masked_credential(&self) -> String {
        let visible: String = self.credential.chars().take(4).collect();
        if self.credential.chars().count() <= 8 {
            "****".to_string()
        } else {
            format!("{}****", visible)
        }
    }
}

/// Static model id to backend routing table
pub struct ModelRouter {
    routes: HashMap<String, RoutingEntry>,
    order: Vec<String>,
    default_model: String,
}

impl ModelRouter {
    pub fn new(config: &BackendsConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut routes = HashMap::new();
        let mut order = Vec::new();
        let entries = config
            .models
            .iter()
            .zip(&config.base_urls)
            .zip(&config.keys);

        for ((model, base_url), key) in entries {
            let entry = RoutingEntry {
                model_id: model.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
                credential: key.clone(),
            };
            if routes.insert(model.clone(), entry).is_some() {
                tracing::warn!("Model '{}' configured twice, last entry wins", model);
            } else {
                order.push(model.clone());
            }
        }

        let default_model = config
            .default_model_id()
            .ok_or(ConfigError::NoBackends)?
            .to_string();

        Ok(Self {
            routes,
            order,
            default_model,
        })
    }

    /// Look up an exact model id.
    pub fn get(&self, model_id: &str) -> Option<&RoutingEntry> {
        self.routes.get(model_id)
    }

    /// Route a requested model, substituting the default model when the
    /// request names none or an unknown one.
    pub fn resolve(&self, requested: Option<&str>) -> &RoutingEntry {
        if let Some(entry) = requested.and_then(|model| self.routes.get(model)) {
            return entry;
        }

        tracing::debug!(
            "Routing {:?} to default model '{}'",
            requested,
            self.default_model
        );
        self.default_route()
    }

    pub fn default_route(&self) -> &RoutingEntry {
        // validated at construction: the default is always a configured model
        &self.routes[&self.default_model]
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Routes in configuration order.
    pub fn routes(&self) -> impl Iterator<Item = &RoutingEntry> {
        self.order.iter().filter_map(|model| self.routes.get(model))
    }
}
