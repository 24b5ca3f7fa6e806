//! HTTP API for the banking assistant

pub mod handlers;
pub mod routes;

pub use routes::create_router;
