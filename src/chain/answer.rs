//! Answer synthesis stage

use super::context::render_context;
use super::prompts::PromptTemplate;
use crate::llm::{ChatMessage, ChatModel, ToolCall};
use crate::neo4j::ResultRow;
use anyhow::{Context, Result};
use std::sync::Arc;

const FUNCTION_RESPONSE_CALL_ID: &str = "call_get_information";
const FUNCTION_RESPONSE_TOOL: &str = "GetInformation";

/// How (question, context) becomes the final answer
pub enum AnswerSynthesizer {
    /// The rendered context is the answer; no model call
    Direct,
    /// One completion over a QA prompt with `{question}` and `{context}`
    Prompted {
        model: Arc<dyn ChatModel>,
        prompt: PromptTemplate,
    },
    /// The context is handed to the model as the result of a tool call
    FunctionResponse {
        model: Arc<dyn ChatModel>,
        system: String,
    },
}

impl AnswerSynthesizer {
    pub fn is_direct(&self) -> bool {
        matches!(self, AnswerSynthesizer::Direct)
    }

    pub async fn synthesize(&self, question: &str, context: &[ResultRow]) -> Result<String> {
        let rendered = render_context(context);
        match self {
            AnswerSynthesizer::Direct => Ok(rendered),
            AnswerSynthesizer::Prompted { model, prompt } => {
                let text = prompt.render(&[("question", question), ("context", &rendered)]);
                model
                    .complete(&[ChatMessage::user(text)])
                    .await
                    .context("Answer synthesis failed")
            }
            AnswerSynthesizer::FunctionResponse { model, system } => model
                .complete(&function_response_messages(system, question, rendered))
                .await
                .context("Answer synthesis failed"),
        }
    }
}

fn function_response_messages(system: &str, question: &str, rendered: String) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system),
        ChatMessage::user(question),
        ChatMessage::Assistant {
            content: None,
            tool_calls: vec![ToolCall {
                id: FUNCTION_RESPONSE_CALL_ID.to_string(),
                name: FUNCTION_RESPONSE_TOOL.to_string(),
                arguments: serde_json::json!({ "question": question }),
            }],
        },
        ChatMessage::Tool {
            tool_call_id: FUNCTION_RESPONSE_CALL_ID.to_string(),
            content: rendered,
        },
    ]
}
