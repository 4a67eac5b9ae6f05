use super::error::UNKNOWN_ERROR_BODY;
use super::{Backend, BackendError, BackendReply, CompletionRequest, RoutingEntry};
use async_trait::async_trait;
use serde::Deserialize;

/// Backend client speaking the OpenAI chat completions API over HTTP.
///
/// One request per call: no retries, no timeout beyond the transport's own.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("toolshim/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }

    fn endpoint(route: &RoutingEntry) -> String {
        format!(
            "{}/v1/chat/completions",
            route.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn complete(
        &self,
        route: &RoutingEntry,
        request: &CompletionRequest,
    ) -> Result<BackendReply, BackendError> {
        let body = request.to_openai()?;

        tracing::debug!("POST {} (model {})", Self::endpoint(route), request.model);
        let response = self
            .http
            .post(Self::endpoint(route))
            .bearer_auth(&route.credential)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNKNOWN_ERROR_BODY.to_string());
            tracing::warn!("Backend {} returned {}", route.model_id, status);
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let reply: CompletionReply = serde_json::from_slice(&bytes)?;
        Ok(BackendReply {
            text: reply.into_text(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Just enough of a chat completion response to read the first choice.
/// Missing pieces read as empty text; the backend's `usage` is ignored.
#[derive(Debug, Default, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyChoice {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionReply {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}
