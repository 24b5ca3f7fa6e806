//! HTTP chat model implementation
//!
//! Implements `ChatModel` against any OpenAI-compatible `/v1/chat/completions`
//! endpoint (OpenAI, Ollama, LiteLLM, vLLM ...). Completions run at
//! temperature 0.

use super::traits::{ChatMessage, ChatModel, Completion, ToolCall, ToolSpec};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// HTTP-based chat model using the OpenAI chat-completions format.
///
/// Cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct HttpChatModel {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded arguments, as the API transports them
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

/// OpenAI-compatible error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        match message {
            ChatMessage::System(content) => WireMessage {
                role: "system".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::User(content) => WireMessage {
                role: "user".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => WireMessage {
                role: "assistant".into(),
                content: content.clone(),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        tool_calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: call.id.clone(),
                                r#type: function_type(),
                                function: WireFunction {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: None,
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => WireMessage {
                role: "tool".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            },
        }
    }
}

impl HttpChatModel {
    /// Create a new HTTP chat model.
    ///
    /// * `url` - full chat-completions endpoint (e.g. `https://api.openai.com/v1/chat/completions`)
    /// * `model` - model name (e.g. `gpt-4o-mini`)
    /// * `api_key` - bearer token, if the endpoint requires one
    pub fn new(url: String, model: String, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            model,
            api_key,
        })
    }

    async fn request(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<WireMessage> {
        let body = CompletionRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: 0.0,
            tools: tools
                .iter()
                .map(|function| WireTool {
                    r#type: "function",
                    function,
                })
                .collect(),
        };

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req
            .send()
            .await
            .with_context(|| format!("Failed to connect to chat completion API at {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(detail) = err.error {
                    anyhow::bail!(
                        "Chat completion API error ({}): {}",
                        status.as_u16(),
                        detail.message
                    );
                }
            }
            anyhow::bail!("Chat completion API returned {}: {}", status.as_u16(), body);
        }

        let resp: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        resp.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("Chat completion API returned no choices")
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let message = self.request(messages, &[]).await?;
        Ok(message.content.unwrap_or_default())
    }

    async fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion> {
        let message = self.request(messages, tools).await?;

        match message.tool_calls {
            Some(calls) if !calls.is_empty() => Ok(Completion::ToolCalls(
                calls
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        arguments: serde_json::from_str(&call.function.arguments)
                            .unwrap_or(serde_json::Value::String(call.function.arguments)),
                        name: call.function.name,
                    })
                    .collect(),
            )),
            _ => Ok(Completion::Text(message.content.unwrap_or_default())),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
