//! Product FAQ answering over the FAQ vector index

use crate::llm::{ChatMessage, ChatModel};
use crate::vector::VectorIndex;
use anyhow::{Context, Result};
use std::sync::Arc;

pub const DEFAULT_FAQ_K: usize = 4;

const FAQ_SYSTEM: &str = "Your job is to use the bank's product FAQs to answer questions about \
product offerings, payment plans and interest rates. Use the following context to answer \
questions. Be as detailed as possible, but don't make up any information that's not from the \
context. If you don't know an answer, say you don't know.

{context}";

pub struct FaqChain {
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn ChatModel>,
    k: usize,
}

impl FaqChain {
    pub fn new(index: Arc<dyn VectorIndex>, model: Arc<dyn ChatModel>, k: usize) -> Self {
        Self { index, model, k }
    }

    pub async fn invoke(&self, question: &str) -> Result<String> {
        let docs = self
            .index
            .similarity_search(question, self.k)
            .await
            .context("FAQ retrieval failed")?;
        tracing::debug!("Retrieved {} FAQ entries", docs.len());

        let context = docs
            .iter()
            .map(|d| d.page_content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let system = FAQ_SYSTEM.replace("{context}", &context);

        self.model
            .complete(&[ChatMessage::system(system), ChatMessage::user(question)])
            .await
            .context("FAQ answer failed")
    }
}
