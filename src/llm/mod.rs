mod cache;
mod client;
mod error;
mod routing;
mod tokens;

pub use cache::{CacheKey, CachePolicy, Clock, ResponseCache, SystemClock};
pub use client::HttpBackend;
pub use error::BackendError;
pub use routing::{ModelRouter, RoutingEntry};
pub use tokens::TokenCounter;

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;

/// A single-turn, non-streaming chat completion: one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(model: String, prompt: String) -> Self {
        Self {
            model,
            prompt,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Wire body for `POST /v1/chat/completions`.
    pub fn to_openai(&self) -> Result<CreateChatCompletionRequest, BackendError> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(self.prompt.clone())
            .build()?
            .into();

        let mut req_builder = CreateChatCompletionRequestArgs::default();
        req_builder.model(&self.model);
        req_builder.messages(vec![message]);
        req_builder.stream(false);

        if let Some(max_tokens) = self.max_tokens {
            let clamped = u16::try_from(max_tokens).unwrap_or(u16::MAX);
            if u32::from(clamped) != max_tokens {
                tracing::warn!(
                    "max_tokens {} exceeds the backend request limit, clamping to {}",
                    max_tokens,
                    clamped
                );
            }
            req_builder.max_tokens(clamped);
        }

        if let Some(temperature) = self.temperature {
            req_builder.temperature(temperature);
        }

        Ok(req_builder.build()?)
    }

    /// The `messages` array exactly as sent to the backend.
    pub fn messages_json(&self) -> String {
        serde_json::json!([{ "role": "user", "content": self.prompt }]).to_string()
    }
}

/// A backend answer: the first choice's text plus the response body as
/// received, kept for exchange dumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub text: String,
    pub body: String,
}

impl From<String> for BackendReply {
    fn from(text: String) -> Self {
        Self {
            body: text.clone(),
            text,
        }
    }
}

/// An OpenAI-style chat completion backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send `request` to `route` and return the reply.
    async fn complete(
        &self,
        route: &RoutingEntry,
        request: &CompletionRequest,
    ) -> Result<BackendReply, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_body_shape() {
        let request = CompletionRequest::new("qwen".to_string(), "do it".to_string())
            .with_max_tokens(Some(512))
            .with_temperature(Some(0.5));

        let body = serde_json::to_value(request.to_openai().unwrap()).unwrap();
        assert_eq!(body["model"], "qwen");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "do it");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_wire_body_omits_unset_sampling() {
        let request = CompletionRequest::new("qwen".to_string(), "do it".to_string());
        let body = serde_json::to_value(request.to_openai().unwrap()).unwrap();
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_oversized_max_tokens_clamped() {
        let request = CompletionRequest::new("qwen".to_string(), "do it".to_string())
            .with_max_tokens(Some(200_000));
        let body = serde_json::to_value(request.to_openai().unwrap()).unwrap();
        assert_eq!(body["max_tokens"], u16::MAX);
    }

    #[test]
    fn test_messages_json_depends_only_on_prompt() {
        let a = CompletionRequest::new("a".to_string(), "same".to_string());
        let b = CompletionRequest::new("b".to_string(), "same".to_string())
            .with_max_tokens(Some(10));
        assert_eq!(a.messages_json(), b.messages_json());
        assert_ne!(
            a.messages_json(),
            CompletionRequest::new("a".to_string(), "other".to_string()).messages_json()
        );
    }
}
