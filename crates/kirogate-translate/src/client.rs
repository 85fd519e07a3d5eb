//! Client-facing request schema (Anthropic Messages API shape).
//!
//! The `content` field of a message is polymorphic: a plain string or a
//! heterogeneous array of typed blocks. Both are modelled as serde enums with
//! catch-all variants so deserialization never rejects a well-formed request
//! over an unknown block type.

use serde::Deserialize;

/// One inbound chat-completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    #[serde(default)]
    pub system: Option<SystemPrompt>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default)]
    pub thinking: Option<Thinking>,
}

/// System prompt: a single string or an ordered sequence of text blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl SystemPrompt {
    /// Coerce to a single string. Non-text blocks are dropped.
    pub fn coerce(&self) -> String {
        match self {
            SystemPrompt::Text(s) => s.clone(),
            SystemPrompt::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.block_type == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message content: string, block array, or anything else (which every
/// extractor treats as empty).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        /// String or array of text blocks; kept raw so coercion stays total.
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

/// Only the `type` tag matters here; extra fields (e.g. a forced tool name)
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thinking {
    #[serde(rename = "type")]
    pub mode: String,
    #[serde(default)]
    pub budget_tokens: Option<u64>,
}

impl Thinking {
    pub fn is_enabled(&self) -> bool {
        self.mode == "enabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_content_deserializes() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(matches!(msg.content, MessageContent::Text(ref s) if s == "hi"));
    }

    #[test]
    fn block_content_deserializes() {
        let msg: Message = serde_json::from_str(
            r#"{"role":"assistant","content":[
                {"type":"text","text":"a"},
                {"type":"tool_use","id":"t1","name":"grep","input":{"q":"x"}},
                {"type":"server_tool_use","id":"s1"}
            ]}"#,
        )
        .unwrap();
        let MessageContent::Blocks(blocks) = msg.content else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[2], ContentBlock::Unknown));
    }

    #[test]
    fn tool_result_keeps_raw_content() {
        let block: ContentBlock = serde_json::from_str(
            r#"{"type":"tool_result","tool_use_id":"t1","content":[{"type":"text","text":"42"}],"is_error":true}"#,
        )
        .unwrap();
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "t1");
                assert!(is_error);
                assert!(content.is_array());
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn system_prompt_coercion() {
        let s: SystemPrompt = serde_json::from_str(r#""be terse""#).unwrap();
        assert_eq!(s.coerce(), "be terse");

        let s: SystemPrompt = serde_json::from_str(
            r#"[{"type":"text","text":"a"},{"type":"image","text":null},{"type":"text","text":"b"}]"#,
        )
        .unwrap();
        assert_eq!(s.coerce(), "a\nb");
    }

    #[test]
    fn non_string_non_array_content_is_tolerated() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"user","content":42}"#).unwrap();
        assert!(matches!(msg.content, MessageContent::Other(_)));
    }
}
