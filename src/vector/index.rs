//! Vector index abstraction and its Neo4j implementation

use super::embedder::Embedder;
use crate::neo4j::{ContextValue, Neo4jClient};
use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

/// A retrieved document: text content plus metadata, in index order
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_content: String,
    pub metadata: IndexMap<String, ContextValue>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: IndexMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: ContextValue) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Read-only similarity search returning documents by descending score
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;
}

/// A Neo4j vector index over nodes carrying a text property and an embedding
pub struct Neo4jVectorIndex {
    client: Arc<Neo4jClient>,
    embedder: Arc<dyn Embedder>,
    index_name: String,
    text_property: String,
}

impl Neo4jVectorIndex {
    pub fn new(
        client: Arc<Neo4jClient>,
        embedder: Arc<dyn Embedder>,
        index_name: impl Into<String>,
        text_property: impl Into<String>,
    ) -> Self {
        Self {
            client,
            embedder,
            index_name: index_name.into(),
            text_property: text_property.into(),
        }
    }
}

#[async_trait]
impl VectorIndex for Neo4jVectorIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let embedding = self.embedder.embed_query(query).await?;
        let hits = self
            .client
            .vector_search(&self.index_name, &self.text_property, &embedding, k)
            .await?;

        tracing::debug!(
            "Vector index '{}' returned {} documents",
            self.index_name,
            hits.len()
        );

        Ok(hits
            .into_iter()
            .map(|hit| Document {
                page_content: hit.text,
                metadata: hit.metadata,
            })
            .collect())
    }
}
