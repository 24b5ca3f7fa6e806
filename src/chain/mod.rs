//! Secure Cypher question-answering chain
//!
//! Pipeline for one question:
//! - `secure`: role restriction and decline handling around everything below
//! - `generation`: schema text (`schema`) + few-shot examples (`examples`) -> Cypher
//! - `corrector`: relationship directions checked against the stored triples
//! - `context`: execution, truncation, enrichment, denylist stripping
//! - `answer`: question + context -> natural-language answer
//!
//! `qa::GraphCypherQaChain` assembles the stages; its builder rejects
//! conflicting options with a [`ChainConfigError`].

pub mod answer;
pub mod context;
pub mod corrector;
pub mod examples;
pub mod generation;
pub mod prompts;
pub mod qa;
pub mod schema;
pub mod secure;

pub use context::ContextShaper;
pub use corrector::CypherQueryCorrector;
pub use examples::ExampleRetriever;
pub use qa::{ChainConfigError, ChainOutput, GraphCypherQaChain, IntermediateStep, StageOptions};
pub use secure::{AccessContext, Role, SecureCypherChain, SecureOutput, DECLINE_MESSAGE};
