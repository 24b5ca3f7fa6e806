//! API handlers

use crate::agent::AgentInput;
use crate::chain::{AccessContext, Role};
use crate::neo4j::CustomerVerificationRequest;
use crate::retry::Idempotent;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Shared server state
pub type AssistantState = Arc<AppState>;

const GENERIC_FAILURE: &str = "An error occurred while processing your request.";

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BankQueryInput {
    pub input: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BankQueryOutput {
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub intermediate_steps: Vec<String>,
}

/// How a speaker is labelled in the transcript
fn speaker_label(role: Option<Role>, raw: Option<&str>) -> String {
    match (role, raw.map(str::trim).filter(|r| !r.is_empty())) {
        (Some(role), _) => role.to_string(),
        (None, Some(raw)) => raw.to_string(),
        (None, None) => "User".to_string(),
    }
}

/// One chat turn: history in, agent (with retries), history out.
///
/// The session lock is held for the whole turn so concurrent requests for the
/// same identity are answered in arrival order.
pub async fn ask_bank_agent(
    State(state): State<AssistantState>,
    Json(req): Json<BankQueryInput>,
) -> Result<Json<BankQueryOutput>, AppError> {
    if req.input.trim().is_empty() {
        return Err(AppError::BadRequest("input must not be empty".to_string()));
    }

    let role = req.role.as_deref().and_then(Role::parse);
    let span = tracing::info_span!(
        "chat",
        request_id = %Uuid::new_v4(),
        role = role.map(|r| r.as_str()).unwrap_or("unspecified")
    );

    async move {
        let access = AccessContext::new(role, req.customer_id.clone());
        let label = speaker_label(role, req.role.as_deref());
        let user_line = format!("{}: {}", label, req.input);

        let mut turn = state
            .sessions
            .begin_turn(role, access.customer_id.as_deref())
            .await;
        let mut lines = turn.history().to_vec();
        lines.push(user_line.clone());
        turn.append(user_line);

        let input = AgentInput {
            input: lines.join("\n"),
            access,
        };
        tracing::debug!("Agent input: {} history lines", lines.len() - 1);

        let agent = state.agent.clone();
        let result = state
            .config
            .retry_policy()
            .run(Idempotent(|| agent.invoke(&input)))
            .await;

        let out = match result {
            Ok(out) => out,
            Err(e) => {
                tracing::error!("Chat turn failed: {:#}", e);
                return Err(AppError::Internal(anyhow::anyhow!(GENERIC_FAILURE)));
            }
        };

        turn.append(format!("bot: {}", out.output));

        Ok(Json(BankQueryOutput {
            output: out.output,
            query: out.query,
            intermediate_steps: out
                .intermediate_steps
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }))
    }
    .instrument(span)
    .await
}

// ============================================================================
// Verification
// ============================================================================

#[derive(Debug, Default, Serialize)]
pub struct VerificationResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Exact match on name (case-insensitive), zip code and phone. A miss says
/// nothing about which field was wrong.
pub async fn verify_customer(
    State(state): State<AssistantState>,
    Json(req): Json<CustomerVerificationRequest>,
) -> Result<Json<VerificationResponse>, AppError> {
    match state.graph.verify_customer(&req).await {
        Ok(Some(customer)) => {
            tracing::info!(customer_id = %customer.customer_id, "Customer verified");
            Ok(Json(VerificationResponse {
                verified: true,
                customer_id: Some(customer.customer_id),
                email: Some(customer.email),
            }))
        }
        Ok(None) => {
            tracing::info!("Verification failed: no matching customer");
            Ok(Json(VerificationResponse::default()))
        }
        Err(e) => {
            tracing::error!("Verification lookup failed: {:#}", e);
            Err(AppError::Internal(anyhow::anyhow!(GENERIC_FAILURE)))
        }
    }
}

// ============================================================================
// Conversation reset
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResetParams {
    #[serde(default = "default_reset_role")]
    pub role: String,
    #[serde(default)]
    pub customer_id: Option<String>,
}

fn default_reset_role() -> String {
    "Customer".to_string()
}

pub async fn reset_conversation(
    State(state): State<AssistantState>,
    Query(params): Query<ResetParams>,
) -> Json<serde_json::Value> {
    tracing::info!("Reset request received for role: {}", params.role);
    state
        .sessions
        .reset(Role::parse(&params.role), params.customer_id.as_deref());
    Json(serde_json::json!({ "status": "success" }))
}

// ============================================================================
// Status and health
// ============================================================================

pub async fn get_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "running" }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub neo4j: String,
}

/// Health check handler, verifies actual connectivity to Neo4j.
///
/// Returns 200 + `"ok"` when connected, 503 + `"unhealthy"` otherwise.
pub async fn health(State(state): State<AssistantState>) -> (StatusCode, Json<HealthResponse>) {
    let neo4j_ok = state.graph.health_check().await.unwrap_or(false);

    let (http_status, status) = if neo4j_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            neo4j: if neo4j_ok {
                "connected".to_string()
            } else {
                "disconnected".to_string()
            },
        }),
    )
}

// ============================================================================
// Error handling
// ============================================================================

pub enum AppError {
    Internal(anyhow::Error),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}
