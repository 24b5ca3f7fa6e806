//! Tools offered to the agent model

use super::faq::FaqChain;
use super::wait_times::WaitTimes;
use crate::chain::{AccessContext, Role, SecureCypherChain};
use crate::llm::{ToolCall, ToolSpec};
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const EXPLORE_BANK_DATABASE: &str = "explore_bank_database";
pub const EXPLORE_PRODUCT_FAQS: &str = "explore_product_faqs";
pub const GET_BRANCH_WAIT_TIME: &str = "get_branch_wait_time";
pub const FIND_MOST_AVAILABLE_BRANCH: &str = "find_most_available_branch";

#[derive(Debug, Deserialize)]
struct BankDatabaseArgs {
    question: String,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionArgs {
    question: String,
}

#[derive(Debug, Deserialize)]
struct BranchArgs {
    branch: String,
}

/// What a tool call produced
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub observation: String,
    /// Cypher run by a database tool call
    pub query: Option<String>,
}

impl ToolResult {
    fn text(observation: impl Into<String>) -> Self {
        Self {
            observation: observation.into(),
            query: None,
        }
    }
}

/// The request's access context wins for customers; otherwise arguments the
/// model supplied fill in, falling back to the request.
pub fn resolve_access(
    request: &AccessContext,
    customer_id: Option<String>,
    role: Option<String>,
) -> AccessContext {
    if request.role == Some(Role::Customer) {
        return request.clone();
    }
    let role = role.as_deref().and_then(Role::parse).or(request.role);
    let customer_id = customer_id.or_else(|| request.customer_id.clone());
    AccessContext::new(role, customer_id)
}

pub struct Toolbox {
    database: Arc<SecureCypherChain>,
    faqs: Arc<FaqChain>,
    wait_times: WaitTimes,
}

impl Toolbox {
    pub fn new(database: Arc<SecureCypherChain>, faqs: Arc<FaqChain>, wait_times: WaitTimes) -> Self {
        Self {
            database,
            faqs,
            wait_times,
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: EXPLORE_PRODUCT_FAQS.to_string(),
                description: "Useful when you need to answer questions about product offerings, \
                              payment plans and interest rates."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": { "question": { "type": "string" } },
                    "required": ["question"]
                }),
            },
            ToolSpec {
                name: EXPLORE_BANK_DATABASE.to_string(),
                description: "Answers questions about customers and their financial data. \
                              If the role is 'Customer', restrict results to the given customer_id."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "question": { "type": "string" },
                        "customer_id": { "type": ["string", "null"] },
                        "role": { "type": ["string", "null"] }
                    },
                    "required": ["question"]
                }),
            },
            ToolSpec {
                name: GET_BRANCH_WAIT_TIME.to_string(),
                description: "Use when asked about current wait times at a specific branch."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": { "branch": { "type": "string" } },
                    "required": ["branch"]
                }),
            },
            ToolSpec {
                name: FIND_MOST_AVAILABLE_BRANCH.to_string(),
                description: "Finds the branch with the shortest wait time.".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
        ]
    }

    /// Run one tool call. Bad arguments and unknown tools become error
    /// observations for the model; failures of the tool itself propagate.
    pub async fn execute(&self, call: &ToolCall, access: &AccessContext) -> Result<ToolResult> {
        match call.name.as_str() {
            EXPLORE_BANK_DATABASE => {
                let args: BankDatabaseArgs = match parse_args(call) {
                    Ok(args) => args,
                    Err(observation) => return Ok(observation),
                };
                let access = resolve_access(access, args.customer_id, args.role);
                let out = self.database.invoke(&args.question, &access).await?;
                Ok(ToolResult {
                    observation: out.to_observation(),
                    query: out.query,
                })
            }
            EXPLORE_PRODUCT_FAQS => {
                let args: QuestionArgs = match parse_args(call) {
                    Ok(args) => args,
                    Err(observation) => return Ok(observation),
                };
                Ok(ToolResult::text(self.faqs.invoke(&args.question).await?))
            }
            GET_BRANCH_WAIT_TIME => {
                let args: BranchArgs = match parse_args(call) {
                    Ok(args) => args,
                    Err(observation) => return Ok(observation),
                };
                Ok(ToolResult::text(
                    self.wait_times.current_wait(&args.branch).await?,
                ))
            }
            FIND_MOST_AVAILABLE_BRANCH => {
                let best = self.wait_times.most_available().await?;
                Ok(ToolResult::text(serde_json::to_string(&best)?))
            }
            other => {
                tracing::warn!("Model called unknown tool '{}'", other);
                Ok(ToolResult::text(format!(
                    "Error: {} is not a valid tool, try one of [{}].",
                    other,
                    self.specs()
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )))
            }
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(call: &ToolCall) -> Result<T, ToolResult> {
    serde_json::from_value(call.arguments.clone()).map_err(|e| {
        tracing::warn!("Invalid arguments for tool '{}': {}", call.name, e);
        ToolResult::text(format!("Error: invalid arguments for {}: {}", call.name, e))
    })
}
