//! ChatModel trait definition
//!
//! Async trait + Send + Sync so a model can be shared as `Arc<dyn ChatModel>`
//! between the Cypher chain, the FAQ chain and the agent.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A tool offered to the model (JSON-schema parameters)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One message of a conversation sent to the model
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User(content.into())
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            ChatMessage::System(s) | ChatMessage::User(s) => Some(s),
            ChatMessage::Assistant { content, .. } => content.as_deref(),
            ChatMessage::Tool { content, .. } => Some(content),
        }
    }
}

/// Result of a completion that may call tools
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

/// Abstract interface for a language-model completion service.
///
/// # Implementations
///
/// - [`HttpChatModel`](super::HttpChatModel): any OpenAI-compatible
///   `/v1/chat/completions` endpoint
/// - `MockChatModel` (tests): scripted completions, records every request
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Plain-text completion
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Completion with tools available; the model either answers or calls tools
    async fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion>;

    /// The name of the model being used
    fn model_name(&self) -> &str;
}
