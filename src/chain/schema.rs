//! Schema projection: structured graph schema to prompt text
//!
//! The rendered text groups node properties, relationship properties and
//! relationship triples, each group comma-joined in map iteration order.

use super::ChainConfigError;
use crate::neo4j::{PropertyDefinition, RelationshipPattern, StructuredSchema};

/// Allow/deny filter over labels and relationship types.
///
/// At most one of the two lists may be non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl TypeFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Result<Self, ChainConfigError> {
        if !include.is_empty() && !exclude.is_empty() {
            return Err(ChainConfigError::ConflictingTypeFilters);
        }
        Ok(Self { include, exclude })
    }

    pub fn allows(&self, name: &str) -> bool {
        if self.include.is_empty() {
            !self.exclude.iter().any(|t| t == name)
        } else {
            self.include.iter().any(|t| t == name)
        }
    }

    /// A triple passes only if its start label, end label and type all pass
    pub fn allows_triple(&self, rel: &RelationshipPattern) -> bool {
        self.allows(&rel.start) && self.allows(&rel.end) && self.allows(&rel.rel_type)
    }
}

fn format_props(name: &str, props: &[PropertyDefinition]) -> String {
    let joined = props
        .iter()
        .map(|p| format!("{}: {}", p.property, p.prop_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {{{}}}", name, joined)
}

/// Render the filtered schema as prompt text
pub fn project(schema: &StructuredSchema, filter: &TypeFilter) -> String {
    let node_props = schema
        .node_props
        .iter()
        .filter(|(label, _)| filter.allows(label))
        .map(|(label, props)| format_props(label, props))
        .collect::<Vec<_>>();

    let rel_props = schema
        .rel_props
        .iter()
        .filter(|(rel_type, _)| filter.allows(rel_type))
        .map(|(rel_type, props)| format_props(rel_type, props))
        .collect::<Vec<_>>();

    let relationships = schema
        .relationships
        .iter()
        .filter(|r| filter.allows_triple(r))
        .map(|r| format!("(:{})-[:{}]->(:{})", r.start, r.rel_type, r.end))
        .collect::<Vec<_>>();

    [
        "Node properties are the following:".to_string(),
        node_props.join(","),
        "Relationship properties are the following:".to_string(),
        rel_props.join(","),
        "The relationships are the following:".to_string(),
        relationships.join(","),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn prop(name: &str, ty: &str) -> PropertyDefinition {
        PropertyDefinition {
            property: name.to_string(),
            prop_type: ty.to_string(),
        }
    }

    fn bank_schema() -> StructuredSchema {
        let mut node_props = IndexMap::new();
        node_props.insert(
            "Customer".to_string(),
            vec![prop("id", "INTEGER"), prop("first_name", "STRING")],
        );
        node_props.insert(
            "Account".to_string(),
            vec![prop("account_number", "STRING"), prop("balance", "FLOAT")],
        );
        node_props.insert("Branch".to_string(), vec![prop("name", "STRING")]);
        let mut rel_props = IndexMap::new();
        rel_props.insert("HAS_ACCOUNT".to_string(), vec![prop("since", "DATE")]);

        StructuredSchema {
            node_props,
            rel_props,
            relationships: vec![
                RelationshipPattern::new("Customer", "HAS_ACCOUNT", "Account"),
                RelationshipPattern::new("Account", "HELD_AT", "Branch"),
            ],
        }
    }

    #[test]
    fn test_project_unfiltered() {
        let text = project(&bank_schema(), &TypeFilter::default());
        assert_eq!(
            text,
            "Node properties are the following:\n\
             Customer {id: INTEGER, first_name: STRING},Account {account_number: STRING, balance: FLOAT},Branch {name: STRING}\n\
             Relationship properties are the following:\n\
             HAS_ACCOUNT {since: DATE}\n\
             The relationships are the following:\n\
             (:Customer)-[:HAS_ACCOUNT]->(:Account),(:Account)-[:HELD_AT]->(:Branch)"
        );
    }

    #[test]
    fn test_exclude_drops_label_and_its_triples() {
        let filter = TypeFilter::new(vec![], vec!["Branch".into()]).unwrap();
        let text = project(&bank_schema(), &filter);
        assert!(!text.contains("Branch"));
        assert!(text.contains("(:Customer)-[:HAS_ACCOUNT]->(:Account)"));
        assert!(!text.contains("HELD_AT"));
    }

    #[test]
    fn test_include_keeps_only_listed_types() {
        let filter = TypeFilter::new(
            vec!["Customer".into(), "Account".into(), "HAS_ACCOUNT".into()],
            vec![],
        )
        .unwrap();
        let text = project(&bank_schema(), &filter);
        assert!(text.contains("Customer {"));
        assert!(text.contains("Account {"));
        assert!(text.contains("HAS_ACCOUNT {since: DATE}"));
        assert!(!text.contains("Branch"));
        assert!(!text.contains("HELD_AT"));
    }

    #[test]
    fn test_include_requires_relationship_type_too() {
        // both endpoints allowed but the type is not
        let filter = TypeFilter::new(vec!["Customer".into(), "Account".into()], vec![]).unwrap();
        let text = project(&bank_schema(), &filter);
        assert!(text.ends_with("The relationships are the following:\n"));
    }

    #[test]
    fn test_both_filters_is_a_config_error() {
        let err = TypeFilter::new(vec!["A".into()], vec!["B".into()]).unwrap_err();
        assert_eq!(err, ChainConfigError::ConflictingTypeFilters);
    }

    #[test]
    fn test_empty_schema() {
        let text = project(&StructuredSchema::default(), &TypeFilter::default());
        assert_eq!(
            text,
            "Node properties are the following:\n\nRelationship properties are the following:\n\nThe relationships are the following:\n"
        );
    }
}
