//! The request translator: one client request in, one upstream envelope plus
//! the per-request tool-name map out.
//!
//! The upstream contract is stricter than the client one: history must
//! alternate user/assistant starting with a user turn and ending with an
//! assistant turn, and the current message is always a user turn. Adjacent
//! user messages merge, missing turns are synthesized.

use std::collections::HashMap;

use uuid::Uuid;

use kirogate_core::GatewayError;

use crate::client::{ChatRequest, Message, Role, SystemPrompt};
use crate::content::{
    extract_assistant_content, extract_user_content, coerce_object, EMPTY_ASSISTANT_CONTENT,
};
use crate::envelope::{
    AssistantResponseMessage, ChatTriggerType, ConversationState, CurrentMessage, HistoryEntry,
    InputSchema, ToolEntry, ToolSpecification, UpstreamRequest, UserInputMessage,
    UserInputMessageContext, AGENT_TASK_TYPE, ORIGIN_AI_EDITOR,
};
use crate::model_map::{map_model, ModelMappingStore};
use crate::tool_names::{is_unsupported, ToolNameRegistry};

/// Canned assistant reply acknowledging an injected system prompt.
pub const SYSTEM_ACK: &str = "I will follow these instructions.";
/// Synthetic user content when a user turn has nothing to say.
pub const CONTINUATION_CONTENT: &str = "continue";
pub const DEFAULT_THINKING_BUDGET: u64 = 10_000;
pub const MAX_TOOL_DESCRIPTION_CHARS: usize = 10_000;

#[derive(Debug)]
pub struct Translation {
    pub request: UpstreamRequest,
    /// Original → sanitized tool names, for the response decoder.
    pub tool_names: HashMap<String, String>,
}

pub fn translate(
    req: &ChatRequest,
    store: Option<&dyn ModelMappingStore>,
) -> Result<Translation, GatewayError> {
    if req.messages.is_empty() {
        return Err(GatewayError::EmptyMessages);
    }
    let model_id = map_model(store, &req.model)
        .ok_or_else(|| GatewayError::UnsupportedModel(req.model.clone()))?;

    // The current window is the longest all-user suffix; everything before it
    // becomes history. A trailing assistant message leaves the window empty
    // and the current message synthetic.
    let mut history_end = req.messages.len();
    while history_end > 0 && req.messages[history_end - 1].role == Role::User {
        history_end -= 1;
    }
    let ends_with_assistant = history_end == req.messages.len();

    let mut names = ToolNameRegistry::new();
    let mut history: Vec<HistoryEntry> = Vec::new();

    let thinking_prefix = req
        .thinking
        .as_ref()
        .filter(|t| t.is_enabled())
        .map(|t| {
            format!(
                "<thinking_mode>enabled</thinking_mode><max_thinking_length>{}</max_thinking_length>",
                t.budget_tokens.unwrap_or(DEFAULT_THINKING_BUDGET)
            )
        })
        .unwrap_or_default();

    let system = req
        .system
        .as_ref()
        .map(SystemPrompt::coerce)
        .unwrap_or_default();
    if !system.is_empty() {
        let content = if !thinking_prefix.is_empty()
            && !system.contains("<thinking_mode>")
            && !system.contains("<max_thinking_length>")
        {
            format!("{thinking_prefix}\n{system}")
        } else {
            system
        };
        push_system_pair(&mut history, content, &model_id);
    } else if !thinking_prefix.is_empty() {
        push_system_pair(&mut history, thinking_prefix, &model_id);
    }

    // History walk: user messages buffer up and merge into one turn per
    // assistant boundary.
    let mut buffer: Vec<&Message> = Vec::new();
    for message in &req.messages[..history_end] {
        match message.role {
            Role::User => buffer.push(message),
            Role::Assistant => {
                if buffer.is_empty() {
                    // alternation demands a user turn before this assistant
                    if !matches!(history.last(), Some(HistoryEntry::User(_))) {
                        history.push(HistoryEntry::User(plain_user(
                            CONTINUATION_CONTENT,
                            &model_id,
                        )));
                    }
                } else {
                    history.push(HistoryEntry::User(merge_user_buffer(&buffer, &model_id)));
                    buffer.clear();
                }
                let extracted = extract_assistant_content(&message.content, &mut names);
                history.push(HistoryEntry::Assistant(AssistantResponseMessage {
                    content: extracted.text,
                    tool_uses: if extracted.tool_uses.is_empty() {
                        None
                    } else {
                        Some(extracted.tool_uses)
                    },
                }));
            }
        }
    }
    if !buffer.is_empty() {
        history.push(HistoryEntry::User(merge_user_buffer(&buffer, &model_id)));
        history.push(HistoryEntry::Assistant(AssistantResponseMessage {
            content: EMPTY_ASSISTANT_CONTENT.to_string(),
            tool_uses: None,
        }));
    }

    // Current message content + tool results.
    let (current_content, current_tool_results) = if ends_with_assistant {
        (CONTINUATION_CONTENT.to_string(), Vec::new())
    } else {
        let mut texts = Vec::new();
        let mut tool_results = Vec::new();
        for message in &req.messages[history_end..] {
            let extracted = extract_user_content(&message.content);
            if !extracted.text.is_empty() {
                texts.push(extracted.text);
            }
            tool_results.extend(extracted.tool_results);
        }
        let content = if texts.is_empty() {
            CONTINUATION_CONTENT.to_string()
        } else {
            texts.join("\n")
        };
        (content, tool_results)
    };

    // Tool definitions, minus unsupported ones.
    let tool_entries: Vec<ToolEntry> = req
        .tools
        .iter()
        .flatten()
        .filter(|t| !is_unsupported(&t.name))
        .map(|t| ToolEntry {
            tool_specification: ToolSpecification {
                name: names.assign(&t.name),
                description: truncate_chars(
                    t.description.as_deref().unwrap_or(""),
                    MAX_TOOL_DESCRIPTION_CHARS,
                ),
                input_schema: InputSchema {
                    json: coerce_object(&t.input_schema),
                },
            },
        })
        .collect();

    let auto_trigger = !tool_entries.is_empty()
        && req
            .tool_choice
            .as_ref()
            .is_some_and(|c| c.choice_type == "any" || c.choice_type == "tool");

    let mut context = UserInputMessageContext::default();
    if !tool_entries.is_empty() {
        context.tools = Some(tool_entries);
    }
    if !current_tool_results.is_empty() {
        context.tool_results = Some(current_tool_results);
    }

    let current_message = UserInputMessage {
        content: current_content,
        model_id: model_id.clone(),
        origin: ORIGIN_AI_EDITOR.to_string(),
        user_input_message_context: (!context.is_empty()).then_some(context),
    };

    let request = UpstreamRequest {
        conversation_state: ConversationState {
            conversation_id: Uuid::new_v4().to_string(),
            agent_continuation_id: Uuid::new_v4().to_string(),
            agent_task_type: AGENT_TASK_TYPE.to_string(),
            chat_trigger_type: if auto_trigger {
                ChatTriggerType::Auto
            } else {
                ChatTriggerType::Manual
            },
            current_message: CurrentMessage {
                user_input_message: current_message,
            },
            history,
        },
        profile_arn: None,
    };

    Ok(Translation {
        request,
        tool_names: names.into_map(),
    })
}

/// Merge a run of adjacent user messages into a single upstream user turn:
/// non-empty texts join with `\n`, tool results concatenate in order.
fn merge_user_buffer(buffer: &[&Message], model_id: &str) -> UserInputMessage {
    let mut texts = Vec::new();
    let mut tool_results = Vec::new();
    for message in buffer {
        let extracted = extract_user_content(&message.content);
        if !extracted.text.is_empty() {
            texts.push(extracted.text);
        }
        tool_results.extend(extracted.tool_results);
    }
    let content = if !texts.is_empty() {
        texts.join("\n")
    } else if !tool_results.is_empty() {
        CONTINUATION_CONTENT.to_string()
    } else {
        String::new()
    };
    let context = (!tool_results.is_empty()).then(|| UserInputMessageContext {
        tools: None,
        tool_results: Some(tool_results),
    });
    UserInputMessage {
        content,
        model_id: model_id.to_string(),
        origin: ORIGIN_AI_EDITOR.to_string(),
        user_input_message_context: context,
    }
}

fn plain_user(content: &str, model_id: &str) -> UserInputMessage {
    UserInputMessage {
        content: content.to_string(),
        model_id: model_id.to_string(),
        origin: ORIGIN_AI_EDITOR.to_string(),
        user_input_message_context: None,
    }
}

fn push_system_pair(history: &mut Vec<HistoryEntry>, content: String, model_id: &str) {
    history.push(HistoryEntry::User(UserInputMessage {
        content,
        model_id: model_id.to_string(),
        origin: ORIGIN_AI_EDITOR.to_string(),
        user_input_message_context: None,
    }));
    history.push(HistoryEntry::Assistant(AssistantResponseMessage {
        content: SYSTEM_ACK.to_string(),
        tool_uses: None,
    }));
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
