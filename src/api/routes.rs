//! API route definitions

use super::handlers::{self, AssistantState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AssistantState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::get_status))
        .route("/health", get(handlers::health))
        // Chat
        .route("/bank-rag-agent", post(handlers::ask_bank_agent))
        .route("/reset-conversation", post(handlers::reset_conversation))
        // Identity
        .route("/verify-customer", post(handlers::verify_customer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
