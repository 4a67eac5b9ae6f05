use crate::config::{Config, ConfigError};
use crate::core::debug_log::{DebugLog, ExchangeRecord};
use crate::core::error::GatewayError;
use crate::core::extract::{AnswerExtractor, ExtractError};
use crate::core::ids::{IdGenerator, RandomIds};
use crate::core::prompt::{messages_to_text, tools_to_json, PromptTemplates};
use crate::core::repair::JsonRepairer;
use crate::core::types::{AnswerResponse, SourceRequest, Usage};
use crate::llm::{
    Backend, BackendError, CacheKey, CachePolicy, CompletionRequest, ModelRouter, ResponseCache,
    TokenCounter,
};
use parking_lot::Mutex;
use std::sync::Arc;

const MESSAGES_PATH: &str = "/v1/messages";

/// The translation pipeline behind `POST /v1/messages`.
pub struct Gateway {
    router: ModelRouter,
    templates: PromptTemplates,
    backend: Arc<dyn Backend>,
    extractor: AnswerExtractor,
    repairer: JsonRepairer,
    cache: Mutex<ResponseCache>,
    tokens: TokenCounter,
    ids: Arc<dyn IdGenerator>,
    debug_log: DebugLog,
}

impl Gateway {
    pub fn new(router: ModelRouter, templates: PromptTemplates, backend: Arc<dyn Backend>) -> Self {
        Self {
            router,
            templates,
            repairer: JsonRepairer::new(backend.clone()),
            backend,
            extractor: AnswerExtractor::new(),
            cache: Mutex::new(ResponseCache::new(CachePolicy::unbounded())),
            tokens: TokenCounter::new(),
            ids: Arc::new(RandomIds),
            debug_log: DebugLog::disabled(),
        }
    }

    /// Build routing, templates, cache and debug dumps from configuration.
    /// Missing templates or inconsistent backends are fatal.
    pub fn from_config(config: &Config, backend: Arc<dyn Backend>) -> Result<Self, ConfigError> {
        let router = ModelRouter::new(&config.backends)?;
        let templates = PromptTemplates::load(&config.prompts)?;

        Ok(Self::new(router, templates, backend)
            .with_normalization(config.prompts.normalize_artifacts)
            .with_cache(ResponseCache::new(CachePolicy::from_config(&config.cache)))
            .with_debug_log(DebugLog::new(&config.debug)))
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    pub fn with_debug_log(mut self, debug_log: DebugLog) -> Self {
        self.debug_log = debug_log;
        self
    }

    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.extractor = self.extractor.with_normalization(enabled);
        self
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    /// Answer one source-protocol request.
    pub async fn handle(&self, request: SourceRequest) -> Result<AnswerResponse, GatewayError> {
        let body = serde_json::to_string(&request).unwrap_or_default();
        self.handle_with_body(request, &body).await
    }

    /// Answer `request`, keeping `raw_body` (the bytes the client sent) for
    /// the debug dump.
    pub async fn handle_with_body(
        &self,
        mut request: SourceRequest,
        raw_body: &str,
    ) -> Result<AnswerResponse, GatewayError> {
        let route = self.router.resolve(request.model.as_deref()).clone();
        request.model = Some(route.model_id.clone());

        let mut record = ExchangeRecord::request(MESSAGES_PATH, "POST", raw_body);

        let system_text = request.system_text();
        let messages_text = messages_to_text(&request.messages);
        let instruction = self.templates.compile(
            &system_text,
            &tools_to_json(request.tools.as_ref()),
            &messages_text,
        );

        let completion = CompletionRequest::new(route.model_id.clone(), instruction)
            .with_max_tokens(request.max_tokens)
            .with_temperature(request.temperature);

        let key = CacheKey::for_request(&completion);
        let cached = self.cache.lock().get(&key, self.ids.as_ref());
        if let Some(hit) = cached {
            tracing::debug!("Cache hit for {}", key.as_str());
            return Ok(hit);
        }
        tracing::debug!("Cache miss for {}", key.as_str());

        let reply = match self.backend.complete(&route, &completion).await {
            Ok(reply) => reply,
            Err(BackendError::Status { status, body }) => {
                record.response(status, &body);
                self.debug_log.write(&record).await;
                return Err(GatewayError::Upstream { status, body });
            }
            Err(e) => {
                tracing::error!("Backend call to {} failed: {}", route.model_id, e);
                return Err(e.into());
            }
        };
        record.response(200, &reply.body);
        let raw = reply.text;

        let cleaned = self.extractor.clean(&raw);
        let answer = match self.extractor.extract_cleaned(&cleaned, self.ids.as_ref()) {
            Ok(answer) => answer,
            Err(ExtractError::NoAnswer(e)) => {
                tracing::warn!("No answer in reply from {}: {}", route.model_id, e);
                record.parse_failed(&cleaned);
                self.debug_log.write(&record).await;
                return Err(GatewayError::ParseFailed { content: cleaned });
            }
            Err(ExtractError::InvalidJson { candidate, source }) => {
                tracing::warn!("Answer JSON from {} invalid: {}", route.model_id, source);
                let repaired = self
                    .repairer
                    .repair(&self.templates, self.router.default_route(), &candidate)
                    .await;
                match repaired {
                    Some(payload) => self.extractor.assemble(payload, self.ids.as_ref()),
                    None => {
                        record.json_failed(&candidate, &source.to_string());
                        self.debug_log.write(&record).await;
                        return Err(GatewayError::ParseFailed { content: cleaned });
                    }
                }
            }
        };

        let usage = Usage {
            input_tokens: self.tokens.estimate_input_tokens(&system_text, &messages_text),
            output_tokens: self.tokens.estimate_output_tokens(&cleaned),
            cache_read_input_tokens: 0,
        };

        let response = AnswerResponse::new(
            self.ids.response_id(),
            route.model_id.clone(),
            answer.content,
            usage,
        );
        tracing::info!(
            "Answered via {}: {} block(s), stop_reason={:?}, tokens in/out {}/{}",
            route.model_id,
            response.content.len(),
            response.stop_reason,
            usage.input_tokens,
            usage.output_tokens
        );

        self.cache.lock().put(key, response.clone());
        Ok(response)
    }
}
