//! Request translation: Anthropic-style chat requests in, CodeWhisperer-style
//! conversation-state envelopes out.

pub mod client;
pub mod content;
pub mod envelope;
pub mod model_map;
pub mod tool_names;
pub mod translate;

pub use client::{ChatRequest, ContentBlock, Message, MessageContent, Role};
pub use envelope::{ConversationState, UpstreamRequest};
pub use model_map::ModelMappingStore;
pub use tool_names::ToolNameRegistry;
pub use translate::{translate, Translation};
