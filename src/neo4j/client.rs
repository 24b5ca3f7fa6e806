//! Neo4j client for the banking graph

use super::models::*;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use super::statement::return_columns;
use neo4rs::{query, ConfigBuilder, Graph, Query, Txn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Labels and relationship types maintained by Neo4j Bloom, never shown to the model
const EXCLUDED_LABELS: [&str; 2] = ["_Bloom_Perspective_", "_Bloom_Scene_"];
const EXCLUDED_RELS: [&str; 1] = ["_Bloom_HAS_SCENE_"];

const NODE_PROPERTIES_QUERY: &str = r#"
    CALL apoc.meta.data()
    YIELD label, other, elementType, type, property
    WHERE NOT type = "RELATIONSHIP" AND elementType = "node"
      AND NOT label IN $excluded_labels
    RETURN label, property, type
"#;

const REL_PROPERTIES_QUERY: &str = r#"
    CALL apoc.meta.data()
    YIELD label, other, elementType, type, property
    WHERE NOT type = "RELATIONSHIP" AND elementType = "relationship"
      AND NOT label IN $excluded_rels
    RETURN label, property, type
"#;

const REL_TRIPLES_QUERY: &str = r#"
    CALL apoc.meta.data()
    YIELD label, other, elementType, type, property
    WHERE type = "RELATIONSHIP" AND elementType = "node"
    UNWIND other AS other_node
    WITH * WHERE NOT label IN $excluded_labels
        AND NOT other_node IN $excluded_labels
    RETURN label AS start, property AS rel_type, toString(other_node) AS end
"#;

/// A document returned by a vector index lookup
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub text: String,
    pub metadata: IndexMap<String, ContextValue>,
    pub score: f64,
}

/// Client for Neo4j operations
pub struct Neo4jClient {
    graph: Arc<Graph>,
}

impl Neo4jClient {
    /// Connect to Neo4j and select the given database
    pub async fn new(uri: &str, user: &str, password: &str, database: &str) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .db(database)
            .build()
            .context("Invalid Neo4j configuration")?;

        let graph = Graph::connect(config)
            .await
            .context("Failed to connect to Neo4j")?;

        tracing::info!("Connected to Neo4j at {} (database {})", uri, database);

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Execute a parameterized Cypher query and collect all rows
    async fn execute_with_params(&self, q: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Collect `(label, property, type)` rows into an ordered property map
    fn group_properties(rows: &[neo4rs::Row]) -> Result<IndexMap<String, Vec<PropertyDefinition>>> {
        let mut props: IndexMap<String, Vec<PropertyDefinition>> = IndexMap::new();
        for row in rows {
            let label: String = row.get("label")?;
            let property: String = row.get("property")?;
            let prop_type: String = row.get("type")?;
            props
                .entry(label)
                .or_default()
                .push(PropertyDefinition::new(property, prop_type));
        }
        Ok(props)
    }

    /// Similarity search over a Neo4j vector index.
    ///
    /// The text property and the embedding are removed from the returned
    /// metadata; every other node property is kept.
    pub async fn vector_search(
        &self,
        index_name: &str,
        text_property: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<VectorHit>> {
        // Convert f32 to f64 for neo4rs
        let embedding_f64: Vec<f64> = embedding.iter().map(|&x| x as f64).collect();

        let cypher = format!(
            r#"
            CALL db.index.vector.queryNodes($index_name, $k, $embedding)
            YIELD node, score
            RETURN node.`{0}` AS text, score,
                   node {{.*, `{0}`: Null, embedding: Null, id: Null}} AS metadata
            ORDER BY score DESC
            "#,
            text_property.replace('`', "")
        );

        let q = query(&cypher)
            .param("index_name", index_name.to_string())
            .param("k", k as i64)
            .param("embedding", embedding_f64);

        let rows = self
            .execute_with_params(q)
            .await
            .with_context(|| format!("Vector search on index '{}' failed", index_name))?;

        rows.iter().map(|row| decode_hit(row, index_name)).collect()
    }

    /// Introspect node properties, relationship properties and relationship triples
    pub async fn structured_schema(&self) -> Result<StructuredSchema> {
        let excluded_labels: Vec<String> = EXCLUDED_LABELS.iter().map(|s| s.to_string()).collect();
        let excluded_rels: Vec<String> = EXCLUDED_RELS.iter().map(|s| s.to_string()).collect();

        let node_rows = self
            .execute_with_params(
                query(NODE_PROPERTIES_QUERY).param("excluded_labels", excluded_labels.clone()),
            )
            .await
            .context("Failed to introspect node properties (is APOC installed?)")?;
        let rel_rows = self
            .execute_with_params(query(REL_PROPERTIES_QUERY).param("excluded_rels", excluded_rels))
            .await
            .context("Failed to introspect relationship properties")?;
        let triple_rows = self
            .execute_with_params(
                query(REL_TRIPLES_QUERY).param("excluded_labels", excluded_labels),
            )
            .await
            .context("Failed to introspect relationship triples")?;

        let mut relationships = Vec::with_capacity(triple_rows.len());
        for row in &triple_rows {
            let start: String = row.get("start")?;
            let rel_type: String = row.get("rel_type")?;
            let end: String = row.get("end")?;
            relationships.push(RelationshipPattern::new(start, rel_type, end));
        }

        let schema = StructuredSchema {
            node_props: Self::group_properties(&node_rows)?,
            rel_props: Self::group_properties(&rel_rows)?,
            relationships,
        };

        tracing::debug!(
            "Introspected schema: {} labels, {} relationship types, {} triples",
            schema.node_props.len(),
            schema.rel_props.len(),
            schema.relationships.len()
        );

        Ok(schema)
    }

    /// Run a generated Cypher statement, decoding each row into typed values.
    ///
    /// The statement runs in an explicit transaction that is always rolled
    /// back, so nothing it does is ever committed.
    pub async fn query(&self, cypher: &str) -> Result<Vec<ResultRow>> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .context("Failed to open a transaction for generated Cypher")?;

        let rows = match Self::collect_in(&mut txn, query(cypher)).await {
            Ok(rows) => rows,
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!("Rollback after failed Cypher also failed: {}", rollback);
                }
                return Err(e.context("Failed to execute generated Cypher"));
            }
        };
        txn.rollback()
            .await
            .context("Failed to roll back generated Cypher transaction")?;

        let columns = return_columns(cypher);
        rows.iter().map(|row| decode_row(row, &columns)).collect()
    }

    async fn collect_in(txn: &mut Txn, q: Query) -> Result<Vec<neo4rs::Row>> {
        let mut stream = txn.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Customer identity lookup used by the verification endpoint
    pub async fn verify_customer(
        &self,
        request: &CustomerVerificationRequest,
    ) -> Result<Option<VerifiedCustomer>> {
        let q = query(
            r#"
            MATCH (c:Customer)
            WHERE toLower(c.first_name) = toLower($first_name)
              AND toLower(c.last_name) = toLower($last_name)
              AND c.zip_code = $zip_code
              AND c.phone_number = $phone
            RETURN toString(c.id) AS customer_id, c.email AS email
            LIMIT 1
            "#,
        )
        .param("first_name", request.first_name.clone())
        .param("last_name", request.last_name.clone())
        .param("zip_code", request.zip_code.clone())
        .param("phone", request.phone.clone());

        let rows = self.execute_with_params(q).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let customer_id: Option<String> = row.get("customer_id").ok();
        Ok(customer_id.map(|customer_id| VerifiedCustomer {
            customer_id,
            email: row.get::<String>("email").unwrap_or_default(),
        }))
    }

    /// List all branch names, alphabetically
    pub async fn list_branch_names(&self) -> Result<Vec<String>> {
        let rows = self
            .execute_with_params(query("MATCH (b:Branch) RETURN b.name AS name ORDER BY name"))
            .await?;
        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            if let Ok(name) = row.get::<String>("name") {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Check connectivity with a trivial statement
    pub async fn health_check(&self) -> Result<bool> {
        match self.graph.run(query("RETURN 1")).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("Neo4j health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Decode one vector search row. Metadata keys come back in key order.
fn decode_hit(row: &neo4rs::Row, index_name: &str) -> Result<VectorHit> {
    let text: Option<String> = row.get("text").ok();
    let score: f64 = row
        .get("score")
        .with_context(|| format!("Failed to decode score from index '{}'", index_name))?;
    let raw: BTreeMap<String, serde_json::Value> = row
        .get("metadata")
        .with_context(|| format!("Failed to decode metadata from index '{}'", index_name))?;
    let metadata = raw
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, ContextValue::from(v)))
        .collect();
    Ok(VectorHit {
        text: text.unwrap_or_default(),
        metadata,
        score,
    })
}

/// Decode one row, columns in RETURN order.
///
/// The driver keeps a row's values in a hash map, so the projection order is
/// taken from the statement text. Columns it could not name follow in key
/// order, as do the keys of nested maps.
fn decode_row(row: &neo4rs::Row, columns: &[String]) -> Result<ResultRow> {
    let mut raw: BTreeMap<String, serde_json::Value> =
        row.to().context("Failed to decode Cypher result row")?;
    let mut decoded = ResultRow::with_capacity(raw.len());
    for column in columns {
        if let Some(value) = raw.remove(column) {
            decoded.insert(column.clone(), ContextValue::from(value));
        }
    }
    decoded.extend(raw.into_iter().map(|(k, v)| (k, ContextValue::from(v))));
    Ok(decoded)
}
