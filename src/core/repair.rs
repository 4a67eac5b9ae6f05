use crate::core::delimiters::FIX;
use crate::core::prompt::PromptTemplates;
use crate::llm::{Backend, CompletionRequest, RoutingEntry};
use serde_json::Value;
use std::sync::Arc;

/// One-shot recovery for answer payloads that fail to parse.
///
/// The broken text is sent to the given route (the default model) with the
/// fix template, and the reply must carry the corrected JSON in a
/// `<Json>...</Json>` span. There is no second attempt.
#[derive(Clone)]
pub struct JsonRepairer {
    backend: Arc<dyn Backend>,
}

impl JsonRepairer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn repair(
        &self,
        templates: &PromptTemplates,
        route: &RoutingEntry,
        candidate: &str,
    ) -> Option<Value> {
        tracing::info!("Asking {} to repair answer JSON", route.model_id);

        let request = CompletionRequest::new(route.model_id.clone(), templates.fix_json(candidate));
        let reply = match self.backend.complete(route, &request).await {
            Ok(reply) => reply.text,
            Err(e) => {
                tracing::warn!("JSON repair call failed: {}", e);
                return None;
            }
        };

        let repaired = parse_fix_reply(&reply);
        if repaired.is_some() {
            tracing::info!("Answer JSON repaired");
        }
        repaired
    }
}

/// Parse the `<Json>` payload of a repair reply.
pub fn parse_fix_reply(reply: &str) -> Option<Value> {
    let span = match FIX.capture(&FIX.unescape(reply)) {
        Ok(span) => span,
        Err(e) => {
            tracing::warn!("JSON repair reply unusable: {}", e);
            return None;
        }
    };

    match serde_json::from_str(span.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Repaired JSON still invalid: {}", e);
            None
        }
    }
}
