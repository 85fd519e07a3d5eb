//! Pure extractors over a message's polymorphic content.
//!
//! All three are total: unknown tags and malformed values bias to the empty
//! string, matching observed upstream tolerance.

use serde_json::Value;

use crate::client::{ContentBlock, MessageContent};
use crate::envelope::{
    ToolResultStatus, ToolResultText, UpstreamToolResult, UpstreamToolUse,
};
use crate::tool_names::{is_unsupported, ToolNameRegistry};

/// Assistant turns must carry non-empty content upstream; this stands in when
/// a turn reduced to tool-uses alone.
pub const EMPTY_ASSISTANT_CONTENT: &str = "OK";

#[derive(Debug, Default)]
pub struct UserContent {
    pub text: String,
    pub tool_results: Vec<UpstreamToolResult>,
}

#[derive(Debug, Default)]
pub struct AssistantContent {
    pub text: String,
    pub tool_uses: Vec<UpstreamToolUse>,
}

/// Plain text view: strings pass through, block arrays keep only text blocks.
pub fn extract_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(s) => s.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        MessageContent::Other(_) => String::new(),
    }
}

/// User view: text plus tool-result side channel. Tool results are never
/// filtered here, even when they reference an unsupported tool.
pub fn extract_user_content(content: &MessageContent) -> UserContent {
    match content {
        MessageContent::Text(s) => UserContent {
            text: s.clone(),
            tool_results: Vec::new(),
        },
        MessageContent::Blocks(blocks) => {
            let mut texts = Vec::new();
            let mut tool_results = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => texts.push(text.as_str()),
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => tool_results.push(UpstreamToolResult {
                        tool_use_id: tool_use_id.clone(),
                        status: if *is_error {
                            ToolResultStatus::Error
                        } else {
                            ToolResultStatus::Success
                        },
                        content: vec![ToolResultText {
                            text: coerce_result_text(content),
                        }],
                    }),
                    _ => {}
                }
            }
            UserContent {
                text: texts.join("\n"),
                tool_results,
            }
        }
        MessageContent::Other(_) => UserContent::default(),
    }
}

/// Assistant view: thinking blocks are folded back into the visible text as a
/// `<thinking>` prefix, tool-use blocks become the upstream side channel.
pub fn extract_assistant_content(
    content: &MessageContent,
    names: &mut ToolNameRegistry,
) -> AssistantContent {
    match content {
        MessageContent::Text(s) => AssistantContent {
            text: s.clone(),
            tool_uses: Vec::new(),
        },
        MessageContent::Blocks(blocks) => {
            let mut thinking = String::new();
            let mut texts = Vec::new();
            let mut tool_uses = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Thinking { thinking: t } => thinking.push_str(t),
                    ContentBlock::Text { text } => texts.push(text.as_str()),
                    ContentBlock::ToolUse { id, name, input } => {
                        if is_unsupported(name) {
                            continue;
                        }
                        tool_uses.push(UpstreamToolUse {
                            tool_use_id: id.clone(),
                            name: names.assign(name),
                            input: coerce_object(input),
                        });
                    }
                    _ => {}
                }
            }

            let body = texts.join("\n");
            let mut text = match (thinking.is_empty(), body.is_empty()) {
                (false, false) => format!("<thinking>{thinking}</thinking>\n\n{body}"),
                (false, true) => format!("<thinking>{thinking}</thinking>"),
                (true, _) => body,
            };
            if text.is_empty() && !tool_uses.is_empty() {
                text = EMPTY_ASSISTANT_CONTENT.to_string();
            }
            AssistantContent { text, tool_uses }
        }
        MessageContent::Other(_) => AssistantContent::default(),
    }
}

/// Coerce an arbitrary value to a JSON object. Strings are parsed; anything
/// that is not an object ends up as `{}`.
pub fn coerce_object(value: &Value) -> Value {
    match value {
        Value::Object(_) => value.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => Value::Object(serde_json::Map::new()),
        },
        _ => Value::Object(serde_json::Map::new()),
    }
}

/// Coerce a tool-result content value to plain text: string → itself, array
/// of text blocks → joined texts, anything else → empty.
fn coerce_result_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
