//! Emulated tool-calling prompt compiler
//!
//! The backend has no native tool calling, so the system prompt, the tool
//! schema and the conversation are rendered into one instruction that asks
//! the model to reply with an `<AnswerInJson>` block.

use crate::config::{ConfigError, PromptsConfig};
use crate::core::types::{ContentPart, MessageContent, SourceMessage, ToolResultContent};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const SYSTEM_PROMPT_PLACEHOLDER: &str = "<$SystemPrompt$>";
pub const TOOLS_PLACEHOLDER: &str = "<$Tools$>";
pub const MESSAGES_PLACEHOLDER: &str = "<$Messages$>";
pub const JSON_PLACEHOLDER: &str = "<$JSON$>";

/// Separator between messages in the rendered history.
pub const MESSAGE_SEPARATOR: &str = "\n---\n";

/// A prompt template with `<$Name$>` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source =
            fs::read_to_string(path).map_err(|_| ConfigError::MissingTemplate(path.to_path_buf()))?;
        Ok(Self::new(source))
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.source.contains(placeholder)
    }

    /// Substitute placeholders in a single left-to-right pass. Substituted
    /// values are never scanned again, so placeholder-like text inside user
    /// content stays literal. Unknown placeholders are kept as written.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find("<$") {
            out.push_str(&rest[..start]);
            let candidate = &rest[start..];
            match values
                .iter()
                .find(|(placeholder, _)| candidate.starts_with(placeholder))
            {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &candidate[placeholder.len()..];
                }
                None => {
                    out.push_str("<$");
                    rest = &candidate[2..];
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// The two templates the gateway runs on, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    function_call: PromptTemplate,
    fix_json: PromptTemplate,
}

impl PromptTemplates {
    pub fn new(function_call: PromptTemplate, fix_json: PromptTemplate) -> Self {
        Self {
            function_call,
            fix_json,
        }
    }

    pub fn load(config: &PromptsConfig) -> Result<Self, ConfigError> {
        let function_call = PromptTemplate::load(&config.function_call_path())?;
        let fix_json = PromptTemplate::load(&config.fix_json_path())?;

        for placeholder in [
            SYSTEM_PROMPT_PLACEHOLDER,
            TOOLS_PLACEHOLDER,
            MESSAGES_PLACEHOLDER,
        ] {
            if !function_call.contains(placeholder) {
                tracing::warn!(
                    "Template {} has no {} placeholder",
                    config.function_call_path().display(),
                    placeholder
                );
            }
        }
        if !fix_json.contains(JSON_PLACEHOLDER) {
            tracing::warn!(
                "Template {} has no {} placeholder",
                config.fix_json_path().display(),
                JSON_PLACEHOLDER
            );
        }

        Ok(Self::new(function_call, fix_json))
    }

    /// Render the tool-calling instruction.
    pub fn compile(&self, system_text: &str, tools_json: &str, messages_text: &str) -> String {
        self.function_call.render(&[
            (SYSTEM_PROMPT_PLACEHOLDER, system_text),
            (TOOLS_PLACEHOLDER, tools_json),
            (MESSAGES_PLACEHOLDER, messages_text),
        ])
    }

    /// Render the JSON repair instruction.
    pub fn fix_json(&self, broken_json: &str) -> String {
        self.fix_json.render(&[(JSON_PLACEHOLDER, broken_json)])
    }
}

/// Serialize the tool schema; absent or null tools become `[]`.
pub fn tools_to_json(tools: Option<&Value>) -> String {
    match tools {
        Some(Value::Null) | None => "[]".to_string(),
        Some(tools) => tools.to_string(),
    }
}

/// Render the conversation as `role:<role>\n<content>` blocks.
pub fn messages_to_text(messages: &[SourceMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("role:{}\n{}", m.role, content_to_text(&m.content)))
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

fn content_to_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(part_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        MessageContent::Other(value) => value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn part_to_text(part: &ContentPart) -> Option<String> {
    match part {
        ContentPart::Text { text } => Some(text.clone()),
        ContentPart::ToolUse { name, input } => {
            let input = if input.is_null() {
                "{}".to_string()
            } else {
                input.to_string()
            };
            Some(format!("[tool_use:{}] {}", name, input))
        }
        ContentPart::ToolResult { content } => {
            let text = match content {
                Some(ToolResultContent::Text(text)) => text.clone(),
                Some(ToolResultContent::Parts(parts)) => parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                None => String::new(),
            };
            Some(format!("[tool_result] {}", text))
        }
        ContentPart::Unsupported => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn templates() -> PromptTemplates {
        PromptTemplates::new(
            PromptTemplate::new("SYS[<$SystemPrompt$>] TOOLS[<$Tools$>] MSGS[<$Messages$>]"),
            PromptTemplate::new("Fix this: <$JSON$>"),
        )
    }

    fn messages(value: serde_json::Value) -> Vec<SourceMessage> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_render_substitutes_every_occurrence() {
        let template = PromptTemplate::new("<$A$>-<$A$>-<$B$>");
        assert_eq!(template.render(&[("<$A$>", "x"), ("<$B$>", "y")]), "x-x-y");
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let template = PromptTemplate::new("cost <$ 5 and <$Other$>");
        assert_eq!(template.render(&[("<$A$>", "x")]), "cost <$ 5 and <$Other$>");
    }

    #[test]
    fn test_render_does_not_expand_substituted_text() {
        let out = templates().compile("<$Tools$>", "[1]", "");
        assert_eq!(out, "SYS[<$Tools$>] TOOLS[[1]] MSGS[]");
    }

    #[test]
    fn test_compile_is_deterministic() {
        let msgs = messages(json!([
            {"role": "user", "content": "hello"},
            {"role": "assistant", "content": [{"type": "text", "text": "hi"}]}
        ]));
        let text = messages_to_text(&msgs);
        let a = templates().compile("sys", "[]", &text);
        let b = templates().compile("sys", "[]", &text);
        assert_eq!(a, b);
        assert_eq!(
            a,
            "SYS[sys] TOOLS[[]] MSGS[role:user\nhello\n---\nrole:assistant\nhi]"
        );
    }

    #[test]
    fn test_messages_to_text_renders_tool_blocks() {
        let msgs = messages(json!([
            {"role": "assistant", "content": [
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_file", "input": {"path": "a.rs"}}
            ]},
            {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "toolu_1", "content": [
                    {"type": "text", "text": "fn main() {}"},
                    {"type": "image", "source": {}},
                    {"type": "text", "text": "EOF"}
                ]}
            ]}
        ]));

        assert_eq!(
            messages_to_text(&msgs),
            "role:assistant\nLet me look.\n[tool_use:read_file] {\"path\":\"a.rs\"}\n---\n\
             role:user\n[tool_result] fn main() {}\nEOF"
        );
    }

    #[test]
    fn test_tool_result_with_string_content() {
        let msgs = messages(json!([
            {"role": "user", "content": [{"type": "tool_result", "content": "42"}]}
        ]));
        assert_eq!(messages_to_text(&msgs), "role:user\n[tool_result] 42");
    }

    #[test]
    fn test_missing_role_and_object_content() {
        let msgs = messages(json!([{"content": {"text": "inline"}}]));
        assert_eq!(messages_to_text(&msgs), "role:user\ninline");
    }

    #[test]
    fn test_tool_use_without_input() {
        let msgs = messages(json!([
            {"role": "assistant", "content": [{"type": "tool_use", "name": "now"}]}
        ]));
        assert_eq!(messages_to_text(&msgs), "role:assistant\n[tool_use:now] {}");
    }

    #[test]
    fn test_tools_to_json() {
        assert_eq!(tools_to_json(None), "[]");
        assert_eq!(tools_to_json(Some(&Value::Null)), "[]");
        assert_eq!(
            tools_to_json(Some(&json!([{"name": "ls"}]))),
            "[{\"name\":\"ls\"}]"
        );
    }

    #[test]
    fn test_fix_json_prompt() {
        assert_eq!(templates().fix_json("{bad"), "Fix this: {bad");
    }

    #[test]
    fn test_load_missing_template_is_config_error() {
        let dir = tempdir().unwrap();
        let config = PromptsConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let err = PromptTemplates::load(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTemplate(p) if p.ends_with("function_call.txt")));
    }

    #[test]
    fn test_load_templates_from_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("function_call.txt"), "S=<$SystemPrompt$>").unwrap();
        std::fs::write(dir.path().join("fix_json.txt"), "J=<$JSON$>").unwrap();
        let config = PromptsConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let templates = PromptTemplates::load(&config).unwrap();
        assert_eq!(templates.compile("x", "[]", ""), "S=x");
        assert_eq!(templates.fix_json("{}"), "J={}");
    }
}
