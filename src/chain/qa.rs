//! Graph Cypher QA chain: generate, correct, execute, shape, answer

use super::answer::AnswerSynthesizer;
use super::context::{ContextShaper, DEFAULT_TOP_K};
use super::corrector::CypherQueryCorrector;
use super::examples::ExampleRetriever;
use super::generation::{CypherGenerator, GenerationStage};
use super::prompts::{
    cypher_generation_prompt, cypher_generation_with_examples_prompt, cypher_qa_prompt,
    PromptTemplate, FUNCTION_RESPONSE_SYSTEM,
};
use super::schema::{project, TypeFilter};
use crate::llm::ChatModel;
use crate::neo4j::{GraphStore, ResultRow, StructuredSchema};
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Conflicting or missing options, fatal when the chain is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainConfigError {
    #[error("Either `exclude_types` or `include_types` can be provided, but not both")]
    ConflictingTypeFilters,
    #[error("Specifying a cypher prompt and cypher model options together is not allowed; pass the prompt via the options")]
    ConflictingCypherPrompt,
    #[error("Specifying a QA prompt and QA model options together is not allowed; pass the prompt via the options")]
    ConflictingQaPrompt,
    #[error("missing required chain component: {0}")]
    Missing(&'static str),
}

/// Per-stage model options. A prompt given here replaces the default one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOptions {
    pub prompt: Option<PromptTemplate>,
}

/// One recorded step of a chain run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntermediateStep {
    Query(String),
    Context(Vec<ResultRow>),
}

impl fmt::Display for IntermediateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    pub result: String,
    /// The statement that was run, after correction (may be empty)
    pub query: String,
    pub intermediate_steps: Vec<IntermediateStep>,
}

pub struct GraphCypherQaChain {
    graph: Arc<dyn GraphStore>,
    schema_text: String,
    generator: CypherGenerator,
    corrector: Option<CypherQueryCorrector>,
    shaper: ContextShaper,
    synthesizer: AnswerSynthesizer,
}

impl GraphCypherQaChain {
    pub fn builder() -> GraphCypherQaChainBuilder {
        GraphCypherQaChainBuilder::default()
    }

    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    /// Generation only: the model's statement with any fence removed, before
    /// correction. May be the decline sentinel.
    pub async fn generate(&self, question: &str) -> Result<String> {
        self.generator.generate(&self.schema_text, question).await
    }

    /// Correct, execute and answer a generated statement
    pub async fn answer(&self, question: &str, generated: &str) -> Result<ChainOutput> {
        let query = match &self.corrector {
            Some(corrector) => corrector.correct(generated),
            None => generated.to_string(),
        };
        if query.is_empty() && !generated.trim().is_empty() {
            tracing::info!("Generated Cypher rejected by schema validation");
        }
        tracing::debug!("Generated Cypher:\n{}", query);

        let mut intermediate_steps = vec![IntermediateStep::Query(query.clone())];
        let context = self.shaper.execute(self.graph.as_ref(), &query).await?;

        if !self.synthesizer.is_direct() {
            tracing::debug!("Full Context:\n{}", super::context::render_context(&context));
        }
        let result = self.synthesizer.synthesize(question, &context).await?;
        if !self.synthesizer.is_direct() {
            intermediate_steps.push(IntermediateStep::Context(context));
        }

        Ok(ChainOutput {
            result,
            query,
            intermediate_steps,
        })
    }

    pub async fn invoke(&self, question: &str) -> Result<ChainOutput> {
        let generated = self.generate(question).await?;
        self.answer(question, &generated).await
    }
}

pub struct GraphCypherQaChainBuilder {
    graph: Option<Arc<dyn GraphStore>>,
    schema: Option<StructuredSchema>,
    cypher_model: Option<Arc<dyn ChatModel>>,
    qa_model: Option<Arc<dyn ChatModel>>,
    example_retriever: Option<ExampleRetriever>,
    include_types: Vec<String>,
    exclude_types: Vec<String>,
    validate_cypher: bool,
    top_k: usize,
    exclude_properties: Vec<String>,
    cypher_prompt: Option<PromptTemplate>,
    qa_prompt: Option<PromptTemplate>,
    cypher_options: Option<StageOptions>,
    qa_options: Option<StageOptions>,
    return_direct: bool,
    use_function_response: bool,
    function_response_system: String,
}

impl Default for GraphCypherQaChainBuilder {
    fn default() -> Self {
        Self {
            graph: None,
            schema: None,
            cypher_model: None,
            qa_model: None,
            example_retriever: None,
            include_types: Vec::new(),
            exclude_types: Vec::new(),
            validate_cypher: false,
            top_k: DEFAULT_TOP_K,
            exclude_properties: Vec::new(),
            cypher_prompt: None,
            qa_prompt: None,
            cypher_options: None,
            qa_options: None,
            return_direct: false,
            use_function_response: false,
            function_response_system: FUNCTION_RESPONSE_SYSTEM.to_string(),
        }
    }
}

impl GraphCypherQaChainBuilder {
    pub fn graph(mut self, graph: Arc<dyn GraphStore>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Schema snapshot; typically `GraphStore::structured_schema()` at startup
    pub fn schema(mut self, schema: StructuredSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn cypher_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.cypher_model = Some(model);
        self
    }

    pub fn qa_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.qa_model = Some(model);
        self
    }

    pub fn example_retriever(mut self, retriever: Option<ExampleRetriever>) -> Self {
        self.example_retriever = retriever;
        self
    }

    pub fn include_types(mut self, types: Vec<String>) -> Self {
        self.include_types = types;
        self
    }

    pub fn exclude_types(mut self, types: Vec<String>) -> Self {
        self.exclude_types = types;
        self
    }

    pub fn validate_cypher(mut self, validate: bool) -> Self {
        self.validate_cypher = validate;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn exclude_properties(mut self, properties: Vec<String>) -> Self {
        self.exclude_properties = properties;
        self
    }

    pub fn cypher_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.cypher_prompt = Some(prompt);
        self
    }

    pub fn qa_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.qa_prompt = Some(prompt);
        self
    }

    pub fn cypher_options(mut self, options: StageOptions) -> Self {
        self.cypher_options = Some(options);
        self
    }

    pub fn qa_options(mut self, options: StageOptions) -> Self {
        self.qa_options = Some(options);
        self
    }

    pub fn return_direct(mut self, direct: bool) -> Self {
        self.return_direct = direct;
        self
    }

    pub fn use_function_response(mut self, enabled: bool) -> Self {
        self.use_function_response = enabled;
        self
    }

    pub fn function_response_system(mut self, system: impl Into<String>) -> Self {
        self.function_response_system = system.into();
        self
    }

    pub fn build(self) -> Result<GraphCypherQaChain, ChainConfigError> {
        if self.cypher_prompt.is_some() && self.cypher_options.is_some() {
            return Err(ChainConfigError::ConflictingCypherPrompt);
        }
        if self.qa_prompt.is_some() && self.qa_options.is_some() {
            return Err(ChainConfigError::ConflictingQaPrompt);
        }
        let filter = TypeFilter::new(self.include_types, self.exclude_types)?;

        let graph = self.graph.ok_or(ChainConfigError::Missing("graph"))?;
        let schema = self.schema.ok_or(ChainConfigError::Missing("schema"))?;
        let cypher_model = self
            .cypher_model
            .ok_or(ChainConfigError::Missing("cypher_model"))?;

        let cypher_prompt = self
            .cypher_options
            .and_then(|o| o.prompt)
            .or(self.cypher_prompt);
        let stage = match self.example_retriever {
            Some(retriever) => GenerationStage::WithExamples {
                retriever,
                prompt: cypher_prompt.unwrap_or_else(cypher_generation_with_examples_prompt),
            },
            None => GenerationStage::WithoutExamples {
                prompt: cypher_prompt.unwrap_or_else(cypher_generation_prompt),
            },
        };

        let synthesizer = if self.return_direct {
            AnswerSynthesizer::Direct
        } else {
            let model = self.qa_model.ok_or(ChainConfigError::Missing("qa_model"))?;
            if self.use_function_response {
                AnswerSynthesizer::FunctionResponse {
                    model,
                    system: self.function_response_system,
                }
            } else {
                let prompt = self
                    .qa_options
                    .and_then(|o| o.prompt)
                    .or(self.qa_prompt)
                    .unwrap_or_else(cypher_qa_prompt);
                AnswerSynthesizer::Prompted { model, prompt }
            }
        };

        // the corrector checks against every stored triple, not the filtered view
        let corrector = self
            .validate_cypher
            .then(|| CypherQueryCorrector::new(schema.relationships.clone()));

        Ok(GraphCypherQaChain {
            graph,
            schema_text: project(&schema, &filter),
            generator: CypherGenerator::new(cypher_model, stage),
            corrector,
            shaper: ContextShaper {
                top_k: self.top_k,
                exclude_properties: self.exclude_properties,
            },
            synthesizer,
        })
    }
}
