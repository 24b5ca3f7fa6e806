//! Relationship-direction validation for generated Cypher
//!
//! Every `(left)-[rel]-(right)` hop in a query is checked against the known
//! `(start, type, end)` triples. A hop written against the stored direction is
//! flipped; a hop that matches no triple in either direction makes the whole
//! query unusable and the corrector returns an empty string.

use crate::neo4j::statement::blank_property_maps;
use crate::neo4j::RelationshipPattern;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PROPERTY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*?\}").expect("valid regex"));

static NODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.+?\)").expect("valid regex"));

// one hop: node, arrow head/tail, optional bracket, node
static PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\([^,()]*?(?:\{.+\})?[^,()]*?\))(<?-)(\[.*?\])?(->?)(\([^,()]*?(?:\{.+\})?[^,()]*?\))",
    )
    .expect("valid regex")
});

static RELATION_TYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(.+?)?(?:\{.*\})?\]").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outgoing,
    Incoming,
    Bidirectional,
}

/// One hop found in the query, with the byte span of its relation text
struct Hop {
    left: String,
    relation: String,
    relation_span: (usize, usize),
    right: String,
}

/// Validates and repairs relationship directions against a schema
#[derive(Debug, Clone)]
pub struct CypherQueryCorrector {
    schemas: Vec<RelationshipPattern>,
}

impl CypherQueryCorrector {
    pub fn new(schemas: Vec<RelationshipPattern>) -> Self {
        Self { schemas }
    }

    /// Returns the corrected query, or an empty string if any hop cannot be
    /// matched to a known relationship in either direction.
    ///
    /// Property maps are blanked before matching so their contents (function
    /// calls, nested maps) never read as nodes or labels.
    pub fn correct(&self, query: &str) -> String {
        let masked = blank_property_maps(query);
        let variables = detect_node_variables(&masked);
        let mut edits: Vec<(usize, usize, String)> = Vec::new();

        for hop in extract_hops(&masked) {
            let (direction, types) = detect_relation_types(&hop.relation);
            if types.iter().any(|t| t.contains('*')) {
                continue;
            }

            let left_labels = detect_labels(&clean_node(&hop.left), &variables);
            let right_labels = detect_labels(&clean_node(&hop.right), &variables);
            let left_to_right = self.verify(&left_labels, &types, &right_labels);
            let right_to_left = self.verify(&right_labels, &types, &left_labels);

            let (start, end) = hop.relation_span;
            let original = &query[start..end];
            let replacement = match direction {
                Direction::Bidirectional if left_to_right || right_to_left => None,
                Direction::Outgoing if left_to_right => None,
                Direction::Incoming if right_to_left => None,
                Direction::Outgoing if right_to_left => {
                    Some(format!("<{}", &original[..original.len() - 1]))
                }
                Direction::Incoming if left_to_right => Some(format!("{}>", &original[1..])),
                _ => return String::new(),
            };

            if let Some(new_relation) = replacement {
                tracing::debug!(
                    "Flipping relationship direction: {} -> {}",
                    original,
                    new_relation
                );
                edits.push((start, end, new_relation));
            }
        }

        let mut corrected = query.to_string();
        for (start, end, text) in edits.into_iter().rev() {
            corrected.replace_range(start..end, &text);
        }
        corrected
    }

    /// True when at least one triple satisfies every non-empty constraint
    fn verify(&self, from: &[String], types: &[String], to: &[String]) -> bool {
        self.schemas.iter().any(|s| {
            (from.is_empty() || from.contains(&s.start))
                && (to.is_empty() || to.contains(&s.end))
                && (types.is_empty() || types.contains(&s.rel_type))
        })
    }
}

fn strip_backticks(s: &str) -> String {
    s.trim().trim_matches('`').to_string()
}

fn clean_node(node: &str) -> String {
    PROPERTY_PATTERN
        .replace_all(node, "")
        .replace(['(', ')'], "")
        .trim()
        .to_string()
}

/// Map each node variable to the labels it is declared with anywhere in the query
fn detect_node_variables(query: &str) -> HashMap<String, Vec<String>> {
    let mut variables: HashMap<String, Vec<String>> = HashMap::new();
    for m in NODE_PATTERN.find_iter(query) {
        let node = clean_node(m.as_str());
        let mut parts = node.split(':');
        let variable = parts.next().unwrap_or_default().trim().to_string();
        let labels = variables.entry(variable).or_default();
        labels.extend(parts.map(strip_backticks).filter(|l| !l.is_empty()));
    }
    variables
}

fn detect_labels(node: &str, variables: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut parts = node.split(':');
    let variable = parts.next().unwrap_or_default().trim();
    if !variable.is_empty() {
        return variables.get(variable).cloned().unwrap_or_default();
    }
    parts
        .map(strip_backticks)
        .filter(|l| !l.is_empty())
        .collect()
}

fn detect_relation_types(relation: &str) -> (Direction, Vec<String>) {
    let direction = if relation.ends_with('>') {
        Direction::Outgoing
    } else if relation.starts_with('<') {
        Direction::Incoming
    } else {
        Direction::Bidirectional
    };

    let types = RELATION_TYPE_PATTERN
        .captures(relation)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .split('|')
                .map(|t| strip_backticks(t.trim().trim_start_matches(':').trim_matches('!')))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    (direction, types)
}

/// Consecutive hops overlap on their shared node, so each search restarts at
/// the right-hand node of the previous hop.
fn extract_hops(query: &str) -> Vec<Hop> {
    let mut hops = Vec::new();
    let mut idx = 0;
    while idx < query.len() {
        let Some(caps) = PATH_PATTERN.captures_at(query, idx) else {
            break;
        };
        let (Some(left), Some(tail), Some(head), Some(right)) =
            (caps.get(1), caps.get(2), caps.get(4), caps.get(5))
        else {
            break;
        };
        hops.push(Hop {
            left: left.as_str().to_string(),
            relation: query[tail.start()..head.end()].to_string(),
            relation_span: (tail.start(), head.end()),
            right: right.as_str().to_string(),
        });
        idx = right.start();
    }
    hops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> CypherQueryCorrector {
        CypherQueryCorrector::new(vec![
            RelationshipPattern::new("Customer", "HAS_ACCOUNT", "Account"),
            RelationshipPattern::new("Account", "HELD_AT", "Branch"),
            RelationshipPattern::new("Customer", "HAS_LOAN", "Loan"),
        ])
    }

    #[test]
    fn test_valid_query_is_unchanged() {
        let q = "MATCH (c:Customer {id: 123})-[:HAS_ACCOUNT]->(a:Account) RETURN a.balance";
        assert_eq!(corrector().correct(q), q);
    }

    #[test]
    fn test_function_call_in_property_map_is_unchanged() {
        let q = "MATCH (c:Customer {id: toInteger('123')})-[:HAS_ACCOUNT]->(a:Account) RETURN a.balance";
        assert_eq!(corrector().correct(q), q);

        let nested = "MATCH (c:Customer {id: toInteger(trim(' 123 ')), tags: {vip: true}})\
                      -[:HAS_ACCOUNT {since: date('2020-01-01')}]->(a:Account {}) RETURN a";
        assert_eq!(corrector().correct(nested), nested);
    }

    #[test]
    fn test_flip_keeps_property_map_text() {
        let q = "MATCH (c:Customer {id: toInteger('123')})<-[r:HAS_ACCOUNT {since: date('2020')}]-(a:Account) RETURN a";
        assert_eq!(
            corrector().correct(q),
            "MATCH (c:Customer {id: toInteger('123')})-[r:HAS_ACCOUNT {since: date('2020')}]->(a:Account) RETURN a"
        );
    }

    #[test]
    fn test_correcting_is_idempotent() {
        let q = "MATCH (a:Account)-[:HAS_ACCOUNT]->(c:Customer) RETURN c";
        let once = corrector().correct(q);
        assert_eq!(corrector().correct(&once), once);
    }

    #[test]
    fn test_outgoing_against_schema_is_flipped() {
        let q = "MATCH (a:Account)-[:HAS_ACCOUNT]->(c:Customer) RETURN c";
        assert_eq!(
            corrector().correct(q),
            "MATCH (a:Account)<-[:HAS_ACCOUNT]-(c:Customer) RETURN c"
        );
    }

    #[test]
    fn test_incoming_against_schema_is_flipped() {
        let q = "MATCH (c:Customer)<-[r:HAS_LOAN]-(l:Loan) RETURN l";
        assert_eq!(
            corrector().correct(q),
            "MATCH (c:Customer)-[r:HAS_LOAN]->(l:Loan) RETURN l"
        );
    }

    #[test]
    fn test_unknown_relationship_empties_query() {
        let q = "MATCH (c:Customer)-[:OWNS_BRANCH]->(b:Branch) RETURN b";
        assert_eq!(corrector().correct(q), "");
    }

    #[test]
    fn test_undirected_accepts_either_direction() {
        let q = "MATCH (b:Branch)-[:HELD_AT]-(a:Account) RETURN a";
        assert_eq!(corrector().correct(q), q);
        let bad = "MATCH (b:Branch)-[:HAS_LOAN]-(a:Account) RETURN a";
        assert_eq!(corrector().correct(bad), "");
    }

    #[test]
    fn test_variables_resolve_labels_declared_elsewhere() {
        let q = "MATCH (c:Customer {id: 1}) MATCH (a)-[:HAS_ACCOUNT]->(c) RETURN a";
        assert_eq!(
            corrector().correct(q),
            "MATCH (c:Customer {id: 1}) MATCH (a)<-[:HAS_ACCOUNT]-(c) RETURN a"
        );
    }

    #[test]
    fn test_chain_of_hops() {
        let q = "MATCH (c:Customer)-[:HAS_ACCOUNT]->(a:Account)-[:HELD_AT]->(b:Branch) RETURN b.name";
        assert_eq!(corrector().correct(q), q);

        let flipped = "MATCH (c:Customer)-[:HAS_ACCOUNT]->(a:Account)<-[:HELD_AT]-(b:Branch) RETURN b.name";
        assert_eq!(corrector().correct(flipped), q);
    }

    #[test]
    fn test_alternative_types_and_backticks() {
        let q = "MATCH (c:`Customer`)-[:HAS_LOAN|HAS_ACCOUNT]->(x) RETURN x";
        assert_eq!(corrector().correct(q), q);
    }

    #[test]
    fn test_variable_length_is_skipped() {
        let q = "MATCH (b:Branch)-[:HELD_AT*1..2]->(c:Customer) RETURN c";
        assert_eq!(corrector().correct(q), q);
    }

    #[test]
    fn test_query_without_relationships() {
        let q = "MATCH (c:Customer) WHERE c.id = 5 RETURN count(c)";
        assert_eq!(corrector().correct(q), q);
    }

    #[test]
    fn test_direction_detection() {
        assert_eq!(detect_relation_types("-[:A]->").0, Direction::Outgoing);
        assert_eq!(detect_relation_types("<-[:A]-").0, Direction::Incoming);
        assert_eq!(detect_relation_types("-[:A]-").0, Direction::Bidirectional);
        assert_eq!(
            detect_relation_types("-[r:A|B {since: 1}]->").1,
            vec!["A".to_string(), "B".to_string()]
        );
    }
}
