//! Wire types for the inbound messages protocol.
//!
//! Inbound shapes are parsed leniently: unknown block types and fields are
//! tolerated so that clients sending newer protocol features still get an
//! answer. Outbound shapes are strict.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound `POST /v1/messages` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemPrompt>,
    #[serde(default)]
    pub messages: Vec<SourceMessage>,
    /// Tool schema, passed through to the prompt verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl SourceRequest {
    pub fn system_text(&self) -> String {
        self.system
            .as_ref()
            .map(SystemPrompt::text)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Segments(Vec<SystemSegment>),
    Other(Value),
}

impl SystemPrompt {
    /// Plain text of the prompt. Only `text` segments contribute.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Segments(segments) => segments
                .iter()
                .filter(|s| s.kind == "text")
                .map(|s| s.text.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Other(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSegment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: MessageContent,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

/// A block inside an inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        content: Option<ToolResultContent>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A block of the assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

impl ContentBlock {
    pub fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ToolUse,
    EndTurn,
}

impl StopReason {
    pub fn for_content(content: &[ContentBlock]) -> Self {
        if content.iter().any(ContentBlock::is_tool_use) {
            Self::ToolUse
        } else {
            Self::EndTurn
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
}

/// Outbound `POST /v1/messages` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl AnswerResponse {
    pub fn new(id: String, model: String, content: Vec<ContentBlock>, usage: Usage) -> Self {
        let stop_reason = StopReason::for_content(&content);
        Self {
            id,
            kind: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model,
            stop_reason,
            usage,
        }
    }

    /// Copy for serving from cache: new id, no token usage. Content,
    /// including tool-use ids, is replayed unchanged.
    pub fn replayed(&self, id: String) -> Self {
        Self {
            id,
            usage: Usage::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_text_from_string() {
        let req: SourceRequest = serde_json::from_value(json!({"system": "be brief"})).unwrap();
        assert_eq!(req.system_text(), "be brief");
    }

    #[test]
    fn test_system_text_joins_text_segments() {
        let req: SourceRequest = serde_json::from_value(json!({
            "system": [
                {"type": "text", "text": "one"},
                {"type": "image", "source": {}},
                {"type": "text", "text": "two", "cache_control": {"type": "ephemeral"}}
            ]
        }))
        .unwrap();
        assert_eq!(req.system_text(), "one\ntwo");
    }

    #[test]
    fn test_system_text_other_shapes_are_empty() {
        let req: SourceRequest = serde_json::from_value(json!({"system": 42})).unwrap();
        assert_eq!(req.system_text(), "");

        let req: SourceRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.system_text(), "");
    }

    #[test]
    fn test_message_blocks_parse() {
        let msg: SourceMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "checking"},
                {"type": "tool_use", "id": "toolu_1", "name": "ls", "input": {"path": "/"}},
                {"type": "thinking", "thinking": "..."}
            ]
        }))
        .unwrap();

        let MessageContent::Parts(parts) = msg.content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[1], ContentPart::ToolUse { name, .. } if name == "ls"));
        assert!(matches!(parts[2], ContentPart::Unsupported));
    }

    #[test]
    fn test_answer_response_serialization() {
        let response = AnswerResponse::new(
            "abc".to_string(),
            "m".to_string(),
            vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "ls".to_string(),
                input: json!({}),
            }],
            Usage::default(),
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["stop_reason"], "tool_use");
        assert_eq!(value["content"][0]["type"], "tool_use");
        assert_eq!(value["usage"]["cache_read_input_tokens"], 0);
    }

    #[test]
    fn test_replayed_zeroes_usage_and_keeps_content() {
        let original = AnswerResponse::new(
            "first".to_string(),
            "m".to_string(),
            vec![ContentBlock::Text {
                text: "hi".to_string(),
            }],
            Usage {
                input_tokens: 10,
                output_tokens: 3,
                cache_read_input_tokens: 0,
            },
        );

        let replay = original.replayed("second".to_string());
        assert_eq!(replay.id, "second");
        assert_eq!(replay.usage, Usage::default());
        assert_eq!(replay.content, original.content);
        assert_eq!(replay.stop_reason, StopReason::EndTurn);
    }
}
