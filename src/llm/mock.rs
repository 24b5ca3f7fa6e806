//! Scripted chat model for tests
//!
//! Completions are popped from a queue in order; every request is recorded so
//! tests can assert on the exact prompt a stage sent.

use super::traits::{ChatMessage, ChatModel, Completion, ToolSpec};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tool_names: Vec<String>,
}

impl RecordedRequest {
    /// All message texts joined, for substring assertions
    pub fn joined_text(&self) -> String {
        self.messages
            .iter()
            .filter_map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Deterministic chat model driven by a queue of scripted completions.
pub struct MockChatModel {
    responses: Mutex<VecDeque<Result<Completion, String>>>,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Build a mock answering with the given texts in order
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let responses = texts
            .into_iter()
            .map(|t| Ok(Completion::Text(t.into())))
            .collect();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, completion: Completion) {
        self.responses.lock().await.push_back(Ok(completion));
    }

    pub async fn push_text(&self, text: &str) {
        self.push(Completion::Text(text.to_string())).await;
    }

    /// Next call fails with this message
    pub async fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .await
            .push_back(Err(message.to_string()));
    }

    pub async fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    async fn next(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<Completion> {
        self.requests.lock().await.push(RecordedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
        match self.responses.lock().await.pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => anyhow::bail!("MockChatModel: no scripted response left"),
        }
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        match self.next(messages, &[]).await? {
            Completion::Text(text) => Ok(text),
            Completion::ToolCalls(_) => anyhow::bail!("MockChatModel: tool calls scripted for a plain completion"),
        }
    }

    async fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion> {
        self.next(messages, tools).await
    }

    fn model_name(&self) -> &str {
        "mock-chat-model"
    }
}
