//! In-memory mock implementation of GraphStore for testing.
//!
//! Query results are scripted: either an exact Cypher match or a fallback
//! result set. Every executed statement is recorded.

use crate::neo4j::models::*;
use crate::neo4j::traits::GraphStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A customer record as stored in the mock
#[derive(Debug, Clone)]
pub struct MockCustomer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub zip_code: String,
    pub phone_number: String,
    pub email: Option<String>,
}

/// In-memory mock implementation of GraphStore for testing.
pub struct MockGraphStore {
    pub schema: RwLock<StructuredSchema>,
    pub scripted_results: RwLock<HashMap<String, Vec<ResultRow>>>,
    pub default_results: RwLock<Vec<ResultRow>>,
    pub executed: RwLock<Vec<String>>,
    pub customers: RwLock<Vec<MockCustomer>>,
    pub branches: RwLock<Vec<String>>,
    /// When set, `query` fails with this message
    pub fail_queries_with: RwLock<Option<String>>,
    pub healthy: RwLock<bool>,
}

impl MockGraphStore {
    /// Create a new empty MockGraphStore.
    pub fn new() -> Self {
        Self {
            schema: RwLock::new(StructuredSchema::default()),
            scripted_results: RwLock::new(HashMap::new()),
            default_results: RwLock::new(Vec::new()),
            executed: RwLock::new(Vec::new()),
            customers: RwLock::new(Vec::new()),
            branches: RwLock::new(Vec::new()),
            fail_queries_with: RwLock::new(None),
            healthy: RwLock::new(true),
        }
    }

    /// Create a mock seeded with the given schema
    pub fn with_schema(schema: StructuredSchema) -> Self {
        let store = Self::new();
        *store.schema.try_write().expect("fresh lock") = schema;
        store
    }

    /// Rows returned for any statement without a scripted result
    pub async fn set_default_results(&self, rows: Vec<ResultRow>) {
        *self.default_results.write().await = rows;
    }

    /// Rows returned for exactly this statement
    pub async fn script(&self, cypher: &str, rows: Vec<ResultRow>) {
        self.scripted_results
            .write()
            .await
            .insert(cypher.to_string(), rows);
    }

    pub async fn add_customer(&self, customer: MockCustomer) {
        self.customers.write().await.push(customer);
    }

    pub async fn add_branch(&self, name: &str) {
        self.branches.write().await.push(name.to_string());
    }

    /// Statements executed so far, in order
    pub async fn executed_queries(&self) -> Vec<String> {
        self.executed.read().await.clone()
    }
}

impl Default for MockGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn structured_schema(&self) -> Result<StructuredSchema> {
        Ok(self.schema.read().await.clone())
    }

    async fn query(&self, cypher: &str) -> Result<Vec<ResultRow>> {
        if let Some(msg) = self.fail_queries_with.read().await.clone() {
            anyhow::bail!(msg);
        }
        self.executed.write().await.push(cypher.to_string());
        if let Some(rows) = self.scripted_results.read().await.get(cypher) {
            return Ok(rows.clone());
        }
        Ok(self.default_results.read().await.clone())
    }

    async fn verify_customer(
        &self,
        request: &CustomerVerificationRequest,
    ) -> Result<Option<VerifiedCustomer>> {
        let customers = self.customers.read().await;
        Ok(customers
            .iter()
            .find(|c| {
                c.first_name.to_lowercase() == request.first_name.to_lowercase()
                    && c.last_name.to_lowercase() == request.last_name.to_lowercase()
                    && c.zip_code == request.zip_code
                    && c.phone_number == request.phone
            })
            .map(|c| VerifiedCustomer {
                customer_id: c.id.clone(),
                email: c.email.clone().unwrap_or_default(),
            }))
    }

    async fn list_branch_names(&self) -> Result<Vec<String>> {
        let mut names = self.branches.read().await.clone();
        names.sort();
        Ok(names)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(*self.healthy.read().await)
    }
}
