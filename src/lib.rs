//! Bank Graph Assistant
//!
//! A role-aware banking assistant over a Neo4j graph:
//! - Secure Cypher QA chain (schema-constrained generation, validation, context shaping)
//! - Tool-calling agent with product FAQ search and branch wait-time lookups
//! - Per-identity conversation memory
//! - HTTP API (axum)

pub mod agent;
pub mod api;
pub mod chain;
pub mod llm;
pub mod neo4j;
pub mod retry;
pub mod session;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub neo4j: Neo4jYamlConfig,
    pub llm: LlmYamlConfig,
    pub embedding: EmbeddingYamlConfig,
    pub chain: ChainYamlConfig,
    pub faq: FaqYamlConfig,
    pub retry: RetryYamlConfig,
    pub agent: AgentYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: String::new(),
            database: "neo4j".into(),
        }
    }
}

/// Chat-completion models section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmYamlConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub agent_model: String,
    pub cypher_model: String,
    pub qa_model: String,
}

impl Default for LlmYamlConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/chat/completions".into(),
            api_key: None,
            agent_model: "gpt-4o-mini".into(),
            cypher_model: "gpt-4o-mini".into(),
            qa_model: "gpt-4o-mini".into(),
        }
    }
}

/// Embedding endpoint section (must match the model the indexes were built with)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingYamlConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
}

impl Default for EmbeddingYamlConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/embeddings".into(),
            model: "text-embedding-3-small".into(),
            api_key: None,
            dimensions: 1536,
        }
    }
}

/// Cypher QA chain section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainYamlConfig {
    pub top_k: usize,
    pub validate_cypher: bool,
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub exclude_properties: Vec<String>,
    pub examples_index: Option<String>,
    pub examples_text_property: String,
    pub use_function_response: bool,
}

impl Default for ChainYamlConfig {
    fn default() -> Self {
        Self {
            top_k: chain::context::DEFAULT_TOP_K,
            validate_cypher: true,
            include_types: Vec::new(),
            exclude_types: Vec::new(),
            exclude_properties: vec!["embedding".into()],
            examples_index: None,
            examples_text_property: "text".into(),
            use_function_response: false,
        }
    }
}

/// Product FAQ index section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FaqYamlConfig {
    pub index: String,
    pub text_property: String,
    pub k: usize,
}

impl Default for FaqYamlConfig {
    fn default() -> Self {
        Self {
            index: "faqs".into(),
            text_property: "text".into(),
            k: agent::faq::DEFAULT_FAQ_K,
        }
    }
}

/// Retry around a whole chat turn
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryYamlConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryYamlConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentYamlConfig {
    pub max_iterations: usize,
}

impl Default for AgentYamlConfig {
    fn default() -> Self {
        Self {
            max_iterations: agent::DEFAULT_MAX_ITERATIONS,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Fatal configuration problems, reported at startup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("NEO4J_URI must not be empty")]
    MissingNeo4jUri,
    #[error("OPENAI_API_KEY (or llm.api_key) is required")]
    MissingLlmApiKey,
    #[error("chain.include_types and chain.exclude_types cannot both be set")]
    ConflictingTypeFilters,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_database: String,
    pub llm_url: String,
    pub llm_api_key: Option<String>,
    pub agent_model: String,
    pub cypher_model: String,
    pub qa_model: String,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub embedding_dimensions: usize,
    pub top_k: usize,
    pub validate_cypher: bool,
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub exclude_properties: Vec<String>,
    /// No index means generation runs without worked examples
    pub examples_index: Option<String>,
    pub examples_text_property: String,
    pub use_function_response: bool,
    pub faq_index: String,
    pub faq_text_property: String,
    pub faq_k: usize,
    pub retry_max_attempts: u32,
    pub retry_delay_ms: u64,
    pub agent_max_iterations: usize,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let llm_api_key = env_string("OPENAI_API_KEY").or(yaml.llm.api_key);
        let embedding_api_key = env_string("EMBEDDING_API_KEY")
            .or(yaml.embedding.api_key)
            .or_else(|| llm_api_key.clone());

        Ok(Self {
            server_port: env_parsed("SERVER_PORT").unwrap_or(yaml.server.port),
            neo4j_uri: env_string("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: env_string("NEO4J_USERNAME").unwrap_or(yaml.neo4j.user),
            neo4j_password: env_string("NEO4J_PASSWORD").unwrap_or(yaml.neo4j.password),
            neo4j_database: env_string("NEO4J_DATABASE").unwrap_or(yaml.neo4j.database),
            llm_url: env_string("LLM_URL").unwrap_or(yaml.llm.url),
            llm_api_key,
            agent_model: env_string("BANK_AGENT_MODEL").unwrap_or(yaml.llm.agent_model),
            cypher_model: env_string("BANK_CYPHER_MODEL").unwrap_or(yaml.llm.cypher_model),
            qa_model: env_string("BANK_QA_MODEL").unwrap_or(yaml.llm.qa_model),
            embedding_url: env_string("EMBEDDING_URL").unwrap_or(yaml.embedding.url),
            embedding_model: env_string("EMBEDDING_MODEL").unwrap_or(yaml.embedding.model),
            embedding_api_key,
            embedding_dimensions: env_parsed("EMBEDDING_DIMENSIONS")
                .unwrap_or(yaml.embedding.dimensions),
            top_k: yaml.chain.top_k,
            validate_cypher: yaml.chain.validate_cypher,
            include_types: yaml.chain.include_types,
            exclude_types: yaml.chain.exclude_types,
            exclude_properties: yaml.chain.exclude_properties,
            examples_index: env_string("NEO4J_CYPHER_EXAMPLES_INDEX_NAME")
                .or(yaml.chain.examples_index),
            examples_text_property: env_string("NEO4J_CYPHER_EXAMPLES_TEXT_NODE_PROPERTY")
                .unwrap_or(yaml.chain.examples_text_property),
            use_function_response: yaml.chain.use_function_response,
            faq_index: env_string("NEO4J_FAQ_INDEX_NAME").unwrap_or(yaml.faq.index),
            faq_text_property: yaml.faq.text_property,
            faq_k: yaml.faq.k,
            retry_max_attempts: yaml.retry.max_attempts,
            retry_delay_ms: yaml.retry.delay_ms,
            agent_max_iterations: yaml.agent.max_iterations,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neo4j_uri.trim().is_empty() {
            return Err(ConfigError::MissingNeo4jUri);
        }
        if self.llm_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigError::MissingLlmApiKey);
        }
        if !self.include_types.is_empty() && !self.exclude_types.is_empty() {
            return Err(ConfigError::ConflictingTypeFilters);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> retry::RetryPolicy {
        retry::RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<dyn neo4j::GraphStore>,
    pub agent: Arc<agent::BankAgent>,
    pub sessions: Arc<session::SessionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state with all services initialized
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = Arc::new(
            neo4j::Neo4jClient::new(
                &config.neo4j_uri,
                &config.neo4j_user,
                &config.neo4j_password,
                &config.neo4j_database,
            )
            .await?,
        );
        let graph: Arc<dyn neo4j::GraphStore> = client.clone();

        let schema = graph.structured_schema().await?;
        tracing::info!(
            "Graph schema: {} labels, {} relationship patterns",
            schema.node_props.len(),
            schema.relationships.len()
        );

        let chat_model = |model: &str| -> Result<Arc<dyn llm::ChatModel>> {
            Ok(Arc::new(llm::HttpChatModel::new(
                config.llm_url.clone(),
                model.to_string(),
                config.llm_api_key.clone(),
            )?))
        };
        let agent_model = chat_model(&config.agent_model)?;
        let cypher_model = chat_model(&config.cypher_model)?;
        let qa_model = chat_model(&config.qa_model)?;

        let embedder: Arc<dyn vector::Embedder> = Arc::new(vector::HttpEmbedder::new(
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            config.embedding_dimensions,
        )?);

        let example_retriever = config.examples_index.as_ref().map(|index| {
            tracing::info!("Cypher generation uses worked examples from index '{}'", index);
            chain::ExampleRetriever::new(Arc::new(vector::Neo4jVectorIndex::new(
                client.clone(),
                embedder.clone(),
                index.clone(),
                config.examples_text_property.clone(),
            )))
        });

        let qa_chain = chain::GraphCypherQaChain::builder()
            .graph(graph.clone())
            .schema(schema)
            .cypher_model(cypher_model)
            .qa_model(qa_model.clone())
            .example_retriever(example_retriever)
            .include_types(config.include_types.clone())
            .exclude_types(config.exclude_types.clone())
            .validate_cypher(config.validate_cypher)
            .top_k(config.top_k)
            .exclude_properties(config.exclude_properties.clone())
            .use_function_response(config.use_function_response)
            .build()?;

        let faq_index = Arc::new(vector::Neo4jVectorIndex::new(
            client.clone(),
            embedder,
            config.faq_index.clone(),
            config.faq_text_property.clone(),
        ));

        let toolbox = agent::Toolbox::new(
            Arc::new(chain::SecureCypherChain::new(Arc::new(qa_chain))),
            Arc::new(agent::FaqChain::new(faq_index, qa_model, config.faq_k)),
            agent::WaitTimes::new(graph.clone()),
        );
        let agent = Arc::new(agent::BankAgent::new(
            agent_model,
            toolbox,
            config.agent_max_iterations,
        ));

        Ok(Self::from_parts(graph, agent, config))
    }

    /// Assemble state from already-built services
    pub fn from_parts(
        graph: Arc<dyn neo4j::GraphStore>,
        agent: Arc<agent::BankAgent>,
        config: Config,
    ) -> Self {
        Self {
            graph,
            agent,
            sessions: Arc::new(session::SessionStore::new()),
            config: Arc::new(config),
        }
    }
}

/// Build the state, bind the port and serve the API until shutdown
pub async fn start_server(config: Config) -> Result<()> {
    let port = config.server_port;
    let state = Arc::new(AppState::new(config).await?);
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Banking assistant listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
