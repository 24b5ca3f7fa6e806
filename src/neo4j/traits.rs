//! GraphStore trait definition
//!
//! Abstract interface over the banking graph. `Neo4jClient` is the production
//! implementation; tests use the in-memory mock.

use crate::neo4j::models::*;
use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface for all graph database operations.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Introspect node properties, relationship properties and relationship triples
    async fn structured_schema(&self) -> Result<StructuredSchema>;

    /// Run a Cypher statement without committing anything and return its rows
    /// in engine order
    async fn query(&self, cypher: &str) -> Result<Vec<ResultRow>>;

    /// Look up a customer by name (case-insensitive), zip code and phone (exact)
    async fn verify_customer(
        &self,
        request: &CustomerVerificationRequest,
    ) -> Result<Option<VerifiedCustomer>>;

    /// Names of all bank branches
    async fn list_branch_names(&self) -> Result<Vec<String>>;

    /// Check connectivity
    async fn health_check(&self) -> Result<bool>;
}
