//! Graph models: structural schema, result rows and banking lookups

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Structural schema (introspected from the live graph)
// ============================================================================

/// A single property declaration on a node label or relationship type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub property: String,
    #[serde(rename = "type")]
    pub prop_type: String,
}

impl PropertyDefinition {
    pub fn new(property: impl Into<String>, prop_type: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            prop_type: prop_type.into(),
        }
    }
}

/// A `(start)-[type]->(end)` triple declared by the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipPattern {
    pub start: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub end: String,
}

impl RelationshipPattern {
    pub fn new(
        start: impl Into<String>,
        rel_type: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            rel_type: rel_type.into(),
            end: end.into(),
        }
    }
}

/// Structured graph schema.
///
/// Maps keep insertion order: the rendered schema text follows the order in
/// which labels were introspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredSchema {
    pub node_props: IndexMap<String, Vec<PropertyDefinition>>,
    pub rel_props: IndexMap<String, Vec<PropertyDefinition>>,
    pub relationships: Vec<RelationshipPattern>,
}

// ============================================================================
// Result rows
// ============================================================================

/// Scalar leaf of a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A value returned by the graph: scalar, ordered list or mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Scalar(Scalar),
    List(Vec<ContextValue>),
    Map(IndexMap<String, ContextValue>),
}

/// One row of a query result, columns in return order
pub type ResultRow = IndexMap<String, ContextValue>;

impl ContextValue {
    pub fn string(value: impl Into<String>) -> Self {
        ContextValue::Scalar(Scalar::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        ContextValue::Scalar(Scalar::Int(value))
    }

    pub fn null() -> Self {
        ContextValue::Scalar(Scalar::Null)
    }

    /// Borrow the mapping if this value is one
    pub fn as_map(&self) -> Option<&IndexMap<String, ContextValue>> {
        match self {
            ContextValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ContextValue::Scalar(Scalar::Null),
            Value::Bool(b) => ContextValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ContextValue::Scalar(Scalar::Int(i)),
                None => ContextValue::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => ContextValue::Scalar(Scalar::String(s)),
            Value::Array(items) => {
                ContextValue::List(items.into_iter().map(ContextValue::from).collect())
            }
            Value::Object(map) => ContextValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ContextValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Customer verification
// ============================================================================

/// Identity details supplied by a customer asking to be verified
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerVerificationRequest {
    pub first_name: String,
    pub last_name: String,
    pub zip_code: String,
    pub phone: String,
}

/// A customer record matched by the verification lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCustomer {
    pub customer_id: String,
    pub email: String,
}
