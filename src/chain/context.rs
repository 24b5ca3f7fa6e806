//! Query execution and context shaping

use crate::neo4j::statement::write_clause;
use crate::neo4j::{ContextValue, GraphStore, ResultRow, Scalar};
use anyhow::Result;
use indexmap::IndexMap;

pub const DEFAULT_TOP_K: usize = 100;

const DISPLAY_KEY: &str = "customer_display";

/// Post-processing applied to query results before answer synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct ContextShaper {
    pub top_k: usize,
    pub exclude_properties: Vec<String>,
}

impl Default for ContextShaper {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            exclude_properties: vec!["embedding".to_string()],
        }
    }
}

impl ContextShaper {
    /// Run the query and shape its rows. An empty query means there is
    /// nothing to run: the context is empty and the graph is not called.
    /// The same holds for a statement containing a write clause.
    pub async fn execute(&self, graph: &dyn GraphStore, query: &str) -> Result<Vec<ResultRow>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if let Some(clause) = write_clause(query) {
            tracing::warn!("Refusing to run generated Cypher with a {} clause", clause);
            return Ok(Vec::new());
        }
        let rows = graph.query(query).await?;
        Ok(self.shape(rows))
    }

    /// Truncate, enrich, strip, in that order
    pub fn shape(&self, mut rows: Vec<ResultRow>) -> Vec<ResultRow> {
        rows.truncate(self.top_k);
        rows.into_iter()
            .map(|mut row| {
                add_customer_display(&mut row);
                strip_keys_from_map(row, &self.exclude_properties)
            })
            .collect()
    }
}

fn display_part(value: &ContextValue) -> String {
    match value {
        ContextValue::Scalar(Scalar::String(s)) => s.clone(),
        ContextValue::Scalar(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Adds `customer_display` when the row has first name, last name and id
pub fn add_customer_display(row: &mut ResultRow) {
    let (Some(first), Some(last), Some(id)) = (
        row.get("first_name"),
        row.get("last_name"),
        row.get("customer_id"),
    ) else {
        return;
    };
    let display = format!(
        "{} {} (ID: {})",
        display_part(first),
        display_part(last),
        display_part(id)
    );
    row.insert(DISPLAY_KEY.to_string(), ContextValue::string(display));
}

/// Remove denylisted keys from every mapping, at any depth
pub fn strip_keys(value: ContextValue, keys: &[String]) -> ContextValue {
    match value {
        ContextValue::Scalar(s) => ContextValue::Scalar(s),
        ContextValue::List(items) => {
            ContextValue::List(items.into_iter().map(|v| strip_keys(v, keys)).collect())
        }
        ContextValue::Map(map) => ContextValue::Map(strip_keys_from_map(map, keys)),
    }
}

fn strip_keys_from_map(
    map: IndexMap<String, ContextValue>,
    keys: &[String],
) -> IndexMap<String, ContextValue> {
    map.into_iter()
        .filter(|(k, _)| !keys.contains(k))
        .map(|(k, v)| (k, strip_keys(v, keys)))
        .collect()
}

/// Context as passed to the answer model
pub fn render_context(rows: &[ResultRow]) -> String {
    serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string())
}
