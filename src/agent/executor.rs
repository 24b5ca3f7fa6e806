//! Tool-calling agent loop

use super::tools::Toolbox;
use crate::chain::AccessContext;
use crate::llm::{ChatMessage, ChatModel, Completion};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MAX_ITERATIONS: usize = 8;

pub const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit.";

const SYSTEM_PROMPT: &str = "You are a helpful banking assistant. Use the user's role and customer_id to determine access:
- If role is 'Banker', you may access all data.
- If role is 'Customer', only answer queries related to their customer_id.
Do not disclose or infer data about other customers for Customers.";

#[derive(Debug, Clone)]
pub struct AgentInput {
    /// Conversation so far, ending with the current user line
    pub input: String,
    pub access: AccessContext,
}

/// One tool invocation and what it returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub tool: String,
    pub tool_input: serde_json::Value,
    pub observation: String,
}

impl fmt::Display for AgentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    pub output: String,
    /// Cypher of the last database tool call, if any
    pub query: Option<String>,
    pub intermediate_steps: Vec<AgentStep>,
}

pub struct BankAgent {
    model: Arc<dyn ChatModel>,
    toolbox: Toolbox,
    max_iterations: usize,
}

impl BankAgent {
    pub fn new(model: Arc<dyn ChatModel>, toolbox: Toolbox, max_iterations: usize) -> Self {
        Self {
            model,
            toolbox,
            max_iterations: max_iterations.max(1),
        }
    }

    fn user_message(input: &AgentInput) -> String {
        serde_json::json!({
            "question": input.input,
            "customer_id": input.access.customer_id,
            "role": input.access.role.map(|r| r.as_str()),
        })
        .to_string()
    }

    pub async fn invoke(&self, input: &AgentInput) -> Result<AgentOutput> {
        let specs = self.toolbox.specs();
        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::user_message(input)),
        ];
        let mut steps = Vec::new();
        let mut query = None;

        for iteration in 0..self.max_iterations {
            let completion = self
                .model
                .complete_with_tools(&messages, &specs)
                .await
                .context("Agent model call failed")?;

            let calls = match completion {
                Completion::Text(output) => {
                    debug!("Agent finished after {} iterations", iteration + 1);
                    return Ok(AgentOutput {
                        output,
                        query,
                        intermediate_steps: steps,
                    });
                }
                Completion::ToolCalls(calls) => calls,
            };

            messages.push(ChatMessage::Assistant {
                content: None,
                tool_calls: calls.clone(),
            });

            for call in calls {
                debug!("Invoking tool '{}' with {}", call.name, call.arguments);
                let result = self.toolbox.execute(&call, &input.access).await?;
                if result.query.is_some() {
                    query = result.query;
                }
                messages.push(ChatMessage::Tool {
                    tool_call_id: call.id.clone(),
                    content: result.observation.clone(),
                });
                steps.push(AgentStep {
                    tool: call.name,
                    tool_input: call.arguments,
                    observation: result.observation,
                });
            }
        }

        tracing::warn!("Agent hit the iteration limit ({})", self.max_iterations);
        Ok(AgentOutput {
            output: STOPPED_MESSAGE.to_string(),
            query,
            intermediate_steps: steps,
        })
    }
}
