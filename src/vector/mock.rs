//! In-memory vector index for tests
//!
//! Scores documents by the number of lowercase words shared with the query,
//! which is enough to get a deterministic, meaningful ranking without
//! embeddings. Ties keep insertion order.

use super::index::{Document, VectorIndex};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

pub struct MockVectorIndex {
    pub documents: RwLock<Vec<Document>>,
    pub queries: RwLock<Vec<String>>,
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

impl MockVectorIndex {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
            queries: RwLock::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        self.queries.write().await.push(query.to_string());
        let query_words = words(query);
        let docs = self.documents.read().await;

        let mut scored: Vec<(usize, &Document)> = docs
            .iter()
            .map(|d| (words(&d.page_content).intersection(&query_words).count(), d))
            .filter(|(score, _)| *score > 0)
            .collect();
        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored.into_iter().take(k).map(|(_, d)| d.clone()).collect())
    }
}
