//! `GraphStore` implementation for `Neo4jClient`.
//!
//! Every method simply delegates to the corresponding inherent method on `Neo4jClient`.

use async_trait::async_trait;

use super::client::Neo4jClient;
use super::models::*;
use super::traits::GraphStore;

#[async_trait]
impl GraphStore for Neo4jClient {
    async fn structured_schema(&self) -> anyhow::Result<StructuredSchema> {
        self.structured_schema().await
    }

    async fn query(&self, cypher: &str) -> anyhow::Result<Vec<ResultRow>> {
        self.query(cypher).await
    }

    async fn verify_customer(
        &self,
        request: &CustomerVerificationRequest,
    ) -> anyhow::Result<Option<VerifiedCustomer>> {
        self.verify_customer(request).await
    }

    async fn list_branch_names(&self) -> anyhow::Result<Vec<String>> {
        self.list_branch_names().await
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        self.health_check().await
    }
}
