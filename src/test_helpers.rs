//! Test helper factories and mock state builders
//!
//! Builds an AppState whose graph, models and vector indexes are all in-memory
//! mocks, and hands the mocks back so tests can script and inspect them.
#![allow(dead_code)]

use crate::agent::{BankAgent, FaqChain, Toolbox, WaitTimes};
use crate::chain::{GraphCypherQaChain, SecureCypherChain};
use crate::llm::mock::MockChatModel;
use crate::neo4j::mock::{MockCustomer, MockGraphStore};
use crate::neo4j::models::*;
use crate::vector::mock::MockVectorIndex;
use crate::vector::Document;
use crate::{AppState, Config};
use indexmap::IndexMap;
use std::sync::Arc;

/// The mocks behind a test AppState
pub struct MockBackends {
    pub graph: Arc<MockGraphStore>,
    pub agent_model: Arc<MockChatModel>,
    pub cypher_model: Arc<MockChatModel>,
    pub qa_model: Arc<MockChatModel>,
    pub faqs: Arc<MockVectorIndex>,
}

/// Config with mock endpoints and no waiting between retries
pub fn test_config() -> Config {
    Config {
        server_port: 0,
        neo4j_uri: "bolt://mock:7687".to_string(),
        neo4j_user: "neo4j".to_string(),
        neo4j_password: "mock".to_string(),
        neo4j_database: "neo4j".to_string(),
        llm_url: "http://mock-llm/v1/chat/completions".to_string(),
        llm_api_key: Some("mock-key".to_string()),
        agent_model: "mock".to_string(),
        cypher_model: "mock".to_string(),
        qa_model: "mock".to_string(),
        embedding_url: "http://mock-llm/v1/embeddings".to_string(),
        embedding_model: "mock".to_string(),
        embedding_api_key: None,
        embedding_dimensions: 3,
        top_k: 100,
        validate_cypher: true,
        include_types: Vec::new(),
        exclude_types: Vec::new(),
        exclude_properties: vec!["embedding".to_string()],
        examples_index: None,
        examples_text_property: "text".to_string(),
        use_function_response: false,
        faq_index: "faqs".to_string(),
        faq_text_property: "text".to_string(),
        faq_k: 4,
        retry_max_attempts: 3,
        retry_delay_ms: 0,
        agent_max_iterations: 8,
    }
}

/// A small bank schema: customers, accounts, loans, branches
pub fn bank_schema() -> StructuredSchema {
    let mut node_props = IndexMap::new();
    node_props.insert(
        "Customer".to_string(),
        vec![
            PropertyDefinition::new("id", "INTEGER"),
            PropertyDefinition::new("first_name", "STRING"),
            PropertyDefinition::new("last_name", "STRING"),
        ],
    );
    node_props.insert(
        "Account".to_string(),
        vec![
            PropertyDefinition::new("account_number", "STRING"),
            PropertyDefinition::new("balance", "FLOAT"),
        ],
    );
    node_props.insert(
        "Branch".to_string(),
        vec![PropertyDefinition::new("name", "STRING")],
    );

    StructuredSchema {
        node_props,
        rel_props: IndexMap::new(),
        relationships: vec![
            RelationshipPattern::new("Customer", "HAS_ACCOUNT", "Account"),
            RelationshipPattern::new("Account", "HELD_AT", "Branch"),
        ],
    }
}

pub fn test_customer(id: &str, first_name: &str, last_name: &str) -> MockCustomer {
    MockCustomer {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        zip_code: "10001".to_string(),
        phone_number: "555-0100".to_string(),
        email: Some(format!("{}@example.com", first_name.to_lowercase())),
    }
}

/// Create a mock AppState with empty in-memory backends
pub fn mock_app_state() -> (AppState, MockBackends) {
    mock_app_state_with(MockGraphStore::with_schema(bank_schema()), Vec::new())
}

/// Create a mock AppState with a pre-seeded graph and FAQ documents
pub fn mock_app_state_with(graph: MockGraphStore, faq_docs: Vec<Document>) -> (AppState, MockBackends) {
    let config = test_config();
    let backends = MockBackends {
        graph: Arc::new(graph),
        agent_model: Arc::new(MockChatModel::new()),
        cypher_model: Arc::new(MockChatModel::new()),
        qa_model: Arc::new(MockChatModel::new()),
        faqs: Arc::new(MockVectorIndex::new(faq_docs)),
    };

    let schema = backends
        .graph
        .schema
        .try_read()
        .map(|s| s.clone())
        .unwrap_or_default();
    let chain = GraphCypherQaChain::builder()
        .graph(backends.graph.clone())
        .schema(schema)
        .cypher_model(backends.cypher_model.clone())
        .qa_model(backends.qa_model.clone())
        .validate_cypher(config.validate_cypher)
        .top_k(config.top_k)
        .exclude_properties(config.exclude_properties.clone())
        .build()
        .expect("valid test chain");

    let toolbox = Toolbox::new(
        Arc::new(SecureCypherChain::new(Arc::new(chain))),
        Arc::new(FaqChain::new(
            backends.faqs.clone(),
            backends.qa_model.clone(),
            config.faq_k,
        )),
        WaitTimes::new(backends.graph.clone()).with_sampler(|_| 15),
    );
    let agent = Arc::new(BankAgent::new(
        backends.agent_model.clone(),
        toolbox,
        config.agent_max_iterations,
    ));

    let state = AppState::from_parts(backends.graph.clone(), agent, config);
    (state, backends)
}
