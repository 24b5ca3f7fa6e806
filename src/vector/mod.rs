//! Vector retrieval: question embedding and similarity search
//!
//! Used for two indexes living in Neo4j: worked Cypher examples (few-shot
//! conditioning of query generation) and product FAQs.

pub mod embedder;
pub mod index;
#[cfg(test)]
pub(crate) mod mock;

pub use embedder::{Embedder, HttpEmbedder};
pub use index::{Document, Neo4jVectorIndex, VectorIndex};
