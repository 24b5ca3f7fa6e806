//! Prompt templates for Cypher generation and answer synthesis

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Marker the generation model emits instead of a query for off-schema,
/// ambiguous or conversational input.
pub const NO_CYPHER_MARKER: &str = "No Cypher statement";

pub fn sentinel_line(question: &str) -> String {
    format!(
        "// {} can be generated for the input \"{}\"",
        NO_CYPHER_MARKER, question
    )
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// A template with `{name}` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute every `{name}` with its value in one pass over the
    /// template. Substituted text is never scanned again, and placeholders
    /// without a value are left as-is.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures| {
                let name = &caps[1];
                values
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

const CYPHER_GENERATION: &str = r#"Task:
Generate Cypher query for a Neo4j graph database.

Instructions:
Use only the provided relationship types and properties in the schema.
Do not use any other relationship types or properties that are not provided.

Schema:
{schema}

Note:
- Do not include any explanations or apologies in your responses.
- Do not respond to any questions that might ask anything other than
  for you to construct a Cypher statement.
- Do not include any text except the generated Cypher statement.
- Never write to the database: no CREATE, MERGE, SET, DELETE or REMOVE.
- Customer ids are stored as integers on Customer.id; compare with toString(c.id)
  when the question quotes an id.
- If the question is vague, general (e.g., "hi", "what's up", "how are you"),
  or cannot be mapped to the schema, return this exact line:
  // No Cypher statement can be generated for the input "{question}"

The question is:
{question}
"#;

const CYPHER_GENERATION_WITH_EXAMPLES: &str = r#"Task:
Generate Cypher query for a Neo4j graph database.

Instructions:
Use only the provided relationship types and properties in the schema.
Do not use any other relationship types or properties that are not provided.

Schema:
{schema}

Note:
- Do not include any explanations or apologies in your responses.
- Do not respond to any questions that might ask anything other than
  for you to construct a Cypher statement.
- Do not include any text except the generated Cypher statement.
- Never write to the database: no CREATE, MERGE, SET, DELETE or REMOVE.
- Customer ids are stored as integers on Customer.id; compare with toString(c.id)
  when the question quotes an id.
- If the question is vague, general (e.g., "hi", "what's up", "how are you"),
  or cannot be mapped to the schema, return this exact line:
  // No Cypher statement can be generated for the input "{question}"

Here are examples of questions and the Cypher queries that answer them.
Follow their style when they are relevant:

{example_queries}
The question is:
{question}
"#;

const CYPHER_QA: &str = r#"You are an assistant that takes the results from a Neo4j Cypher query and forms a human-readable response.
The query results section contains the results of a Cypher query that was generated based on a user's natural language question.
The provided information is authoritative, you must never doubt it or try to use your internal knowledge to correct it.
Make the answer sound like a response to the question. Keep it concise.

If the provided information is empty, say that you don't know the answer.
Never mention Cypher, queries or the database in your answer.
When a customer_display field is present, use it to refer to the customer.

The user asked the following question:
{question}

A Cypher query was run and generated these results:
{context}

Helpful Answer:
"#;

pub const FUNCTION_RESPONSE_SYSTEM: &str = "You are an assistant that helps to form nice and human
understandable answers based on the provided information from tools.
Do not add any other information that wasn't present in the tools, and use
very concise style in interpreting results!
";

pub fn cypher_generation_prompt() -> PromptTemplate {
    PromptTemplate::new(CYPHER_GENERATION)
}

pub fn cypher_generation_with_examples_prompt() -> PromptTemplate {
    PromptTemplate::new(CYPHER_GENERATION_WITH_EXAMPLES)
}

pub fn cypher_qa_prompt() -> PromptTemplate {
    PromptTemplate::new(CYPHER_QA)
}

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));

/// Contents of the first fenced block, or the whole text when there is none.
///
/// A language tag right after the opening fence (```` ```cypher ````) is
/// dropped along with surrounding whitespace.
pub fn extract_cypher(text: &str) -> String {
    match FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        Some(block) => {
            let inner = block.as_str();
            let inner = inner
                .strip_prefix("cypher")
                .filter(|rest| rest.starts_with(char::is_whitespace))
                .unwrap_or(inner);
            inner.trim().to_string()
        }
        None => text.to_string(),
    }
}
