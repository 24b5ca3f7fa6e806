//! Query generation stage
//!
//! Whether worked examples condition the prompt is decided once, when the
//! stage is built, and carried as a variant.

use super::examples::{format_examples, ExampleRetriever};
use super::prompts::{extract_cypher, PromptTemplate};
use crate::llm::{ChatMessage, ChatModel};
use anyhow::{Context, Result};
use std::sync::Arc;

pub enum GenerationStage {
    WithExamples {
        retriever: ExampleRetriever,
        prompt: PromptTemplate,
    },
    WithoutExamples {
        prompt: PromptTemplate,
    },
}

impl GenerationStage {
    pub fn uses_examples(&self) -> bool {
        matches!(self, GenerationStage::WithExamples { .. })
    }
}

/// Turns a question into a Cypher statement (or the decline sentinel)
pub struct CypherGenerator {
    model: Arc<dyn ChatModel>,
    stage: GenerationStage,
}

impl CypherGenerator {
    pub fn new(model: Arc<dyn ChatModel>, stage: GenerationStage) -> Self {
        Self { model, stage }
    }

    pub fn stage(&self) -> &GenerationStage {
        &self.stage
    }

    /// Retrieve examples when configured, then generate
    pub async fn generate(&self, schema_text: &str, question: &str) -> Result<String> {
        let examples = match &self.stage {
            GenerationStage::WithExamples { retriever, .. } => {
                let docs = retriever.retrieve(question).await?;
                Some(format_examples(&docs))
            }
            GenerationStage::WithoutExamples { .. } => None,
        };
        self.generate_with(schema_text, examples.as_deref(), question)
            .await
    }

    /// Single completion over the assembled prompt; the first fenced block of
    /// the answer is kept if there is one.
    pub async fn generate_with(
        &self,
        schema_text: &str,
        examples: Option<&str>,
        question: &str,
    ) -> Result<String> {
        let prompt = match &self.stage {
            GenerationStage::WithExamples { prompt, .. } => prompt.render(&[
                ("schema", schema_text),
                ("example_queries", examples.unwrap_or_default()),
                ("question", question),
            ]),
            GenerationStage::WithoutExamples { prompt } => {
                prompt.render(&[("schema", schema_text), ("question", question)])
            }
        };

        let raw = self
            .model
            .complete(&[ChatMessage::user(prompt)])
            .await
            .context("Cypher generation failed")?;

        Ok(extract_cypher(&raw))
    }
}
