use crate::core::delimiters::{SpanError, ANSWER, THINK};
use crate::core::ids::IdGenerator;
use crate::core::types::{ContentBlock, StopReason};
use serde_json::{json, Value};
use thiserror::Error;

/// Structured answer recovered from a backend reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// No usable answer span. JSON repair cannot help here.
    #[error(transparent)]
    NoAnswer(#[from] SpanError),

    /// A span was found but its payload does not parse.
    #[error("answer payload is not valid JSON: {source}")]
    InvalidJson {
        candidate: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Pulls the `<AnswerInJson>` payload out of free-form model output.
#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    normalize_artifacts: bool,
}

impl Default for AnswerExtractor {
    fn default() -> Self {
        Self {
            normalize_artifacts: true,
        }
    }
}

impl AnswerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the single-occurrence `&quot;` and `\_` rewrite.
    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalize_artifacts = enabled;
        self
    }

    /// Drop `<think>` spans and unescape answer tags.
    pub fn clean(&self, raw: &str) -> String {
        ANSWER.unescape(&THINK.strip(raw))
    }

    pub fn extract(&self, raw: &str, ids: &dyn IdGenerator) -> Result<Answer, ExtractError> {
        self.extract_cleaned(&self.clean(raw), ids)
    }

    /// Like [`extract`](Self::extract), for text already passed through
    /// [`clean`](Self::clean).
    pub fn extract_cleaned(
        &self,
        cleaned: &str,
        ids: &dyn IdGenerator,
    ) -> Result<Answer, ExtractError> {
        let candidate = self.candidate(cleaned)?;
        match serde_json::from_str::<Value>(&candidate) {
            Ok(payload) => Ok(self.assemble(payload, ids)),
            Err(source) => Err(ExtractError::InvalidJson { candidate, source }),
        }
    }

    /// The JSON text inside the answer span, trimmed to its outermost
    /// braces.
    pub fn candidate(&self, cleaned: &str) -> Result<String, SpanError> {
        let span = ANSWER.capture(cleaned)?;
        let mut candidate = span.trim().to_string();

        if self.normalize_artifacts {
            candidate = candidate.replacen("&quot;", "\"", 1).replacen("\\_", "_", 1);
        }

        if let Some(head) = candidate.find('{') {
            if head > 0 {
                candidate.drain(..head);
            }
        }
        if let Some(tail) = candidate.rfind('}') {
            if tail > 0 {
                candidate.truncate(tail + 1);
            }
        }

        Ok(candidate)
    }

    /// Build content blocks from a parsed payload, giving every tool use a
    /// fresh id.
    pub fn assemble(&self, payload: Value, ids: &dyn IdGenerator) -> Answer {
        let content = match payload {
            Value::Object(mut map) => map.remove("content"),
            _ => None,
        };

        let content: Vec<ContentBlock> = match content {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| answer_block(item, ids))
                .collect(),
            Some(Value::String(text)) => vec![ContentBlock::Text { text }],
            other => {
                tracing::warn!("Answer payload has no content array: {:?}", other);
                Vec::new()
            }
        };

        Answer {
            stop_reason: StopReason::for_content(&content),
            content,
        }
    }
}

fn answer_block(mut item: Value, ids: &dyn IdGenerator) -> Option<ContentBlock> {
    let kind = item.get("type").and_then(Value::as_str).map(str::to_string);
    let mut take_string = |field: &str| match item.get_mut(field).map(Value::take) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };

    match kind.as_deref() {
        Some("text") => Some(ContentBlock::Text {
            text: take_string("text"),
        }),
        Some("tool_use") => {
            let name = take_string("name");
            let input = match item.get_mut("input").map(Value::take) {
                Some(Value::Null) | None => json!({}),
                Some(input) => input,
            };
            Some(ContentBlock::ToolUse {
                id: ids.tool_call_id(),
                name,
                input,
            })
        }
        other => {
            tracing::warn!("Skipping answer block of unsupported type {:?}", other);
            None
        }
    }
}
