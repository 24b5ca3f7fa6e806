//! Few-shot example retrieval for query generation

use crate::neo4j::{ContextValue, Scalar};
use crate::vector::{Document, VectorIndex};
use anyhow::Result;
use std::sync::Arc;

/// Number of worked examples retrieved per question
pub const DEFAULT_EXAMPLE_COUNT: usize = 8;

/// Retrieves the worked (question, query) examples closest to a question
#[derive(Clone)]
pub struct ExampleRetriever {
    index: Arc<dyn VectorIndex>,
    k: usize,
}

impl ExampleRetriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            k: DEFAULT_EXAMPLE_COUNT,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Ranked by descending similarity; empty when nothing matches
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Document>> {
        let docs = self.index.similarity_search(question, self.k).await?;
        tracing::debug!("Retrieved {} Cypher examples", docs.len());
        Ok(docs)
    }
}

fn metadata_text(value: &ContextValue) -> String {
    match value {
        ContextValue::Scalar(Scalar::String(s)) => s.clone(),
        ContextValue::Scalar(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Render documents for the generation prompt: the text, then each metadata
/// key and value, then a blank line.
pub fn format_examples(documents: &[Document]) -> String {
    let mut out = String::new();
    for doc in documents {
        out.push_str(&doc.page_content);
        out.push('\n');
        for (key, value) in &doc.metadata {
            out.push_str(&format!("{}:\n{}", key, metadata_text(value)));
        }
        out.push_str("\n\n");
    }
    out
}
