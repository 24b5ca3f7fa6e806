//! Language-model completion service
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `ChatModel` trait: plain and tool-calling completions
//! - `HttpChatModel`: any OpenAI-compatible chat-completions API
//! - `MockChatModel`: scripted completions for tests

#[cfg(test)]
pub(crate) mod mock;
pub mod provider;
pub mod traits;

pub use provider::HttpChatModel;
pub use traits::{ChatMessage, ChatModel, Completion, ToolCall, ToolSpec};
