//! Banking assistant agent
//!
//! The model picks among four tools per turn: the secure Cypher chain over the
//! bank graph, the product FAQ chain, and two branch wait-time lookups.

pub mod executor;
pub mod faq;
pub mod tools;
pub mod wait_times;

pub use executor::{AgentInput, AgentOutput, AgentStep, BankAgent, DEFAULT_MAX_ITERATIONS};
pub use faq::FaqChain;
pub use tools::Toolbox;
pub use wait_times::WaitTimes;
