//! Bulk import of JSON graph documents.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "label": "Person", "properties": { "name": "张三" } },
//!     { "label": "Person", "properties": { "name": "李四" } }
//!   ],
//!   "relationships": [
//!     { "startNodeName": "张三", "endNodeName": "李四", "relationshipType": "认识" }
//!   ]
//! }
//! ```
//!
//! Nodes are created before relationships. Relationships are merged, but
//! nodes are always created, so importing the same document twice duplicates
//! its nodes. [`seed_document`] only imports into an empty store.

use super::graph::{GraphService, RelationshipRequest};
use crate::models::properties_from_json;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::instrument;

/// A node to create.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentNode {
    /// Node label.
    pub label: String,
    /// Node properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A relationship to merge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRelationship {
    /// Start node name.
    pub start_node_name: String,
    /// End node name.
    pub end_node_name: String,
    /// Relationship type.
    pub relationship_type: String,
    /// Relationship properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A graph document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphDocument {
    /// Nodes, created in order.
    #[serde(default)]
    pub nodes: Vec<DocumentNode>,
    /// Relationships, merged after all nodes exist.
    #[serde(default)]
    pub relationships: Vec<DocumentRelationship>,
}

impl GraphDocument {
    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not a graph document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("invalid graph document: {e}")))
    }

    /// Reads a document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_graph_document".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_json(&text)
    }
}

/// Counts from an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Nodes created.
    pub nodes: usize,
    /// Relationships created or merged.
    pub relationships: usize,
}

/// Imports `document` through `graph`, stopping at the first failure.
///
/// # Errors
///
/// Returns the first validation or store error, including
/// [`Error::NotFound`] for a relationship whose endpoint is missing.
#[instrument(skip(graph, document), fields(nodes = document.nodes.len(), relationships = document.relationships.len()))]
pub fn import_document(graph: &GraphService, document: GraphDocument) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for node in document.nodes {
        graph.create_node(&node.label, properties_from_json(node.properties)?)?;
        summary.nodes += 1;
    }

    for rel in document.relationships {
        graph.merge_relationship(RelationshipRequest {
            start: rel.start_node_name,
            end: rel.end_node_name,
            rel_type: rel.relationship_type,
            properties: properties_from_json(rel.properties)?,
        })?;
        summary.relationships += 1;
    }

    tracing::info!(
        nodes = summary.nodes,
        relationships = summary.relationships,
        "Imported graph document"
    );
    Ok(summary)
}

/// Imports `document` only when the store holds no nodes yet.
///
/// Returns `None` when the store was already populated.
///
/// # Errors
///
/// Returns an error if the store cannot be counted or the import fails.
pub fn seed_document(
    graph: &GraphService,
    document: GraphDocument,
) -> Result<Option<ImportSummary>> {
    let existing = graph.stats()?.node_count;
    if existing > 0 {
        tracing::debug!(existing, "Graph store already populated, skipping seed");
        return Ok(None);
    }
    import_document(graph, document).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GraphBackendKind, GraphSettings};
    use crate::storage::graph::InMemoryGraphStore;
    use crate::storage::{GraphBulkheadConfig, GraphGateway, open_graph_store};
    use std::sync::Arc;

    const DOCUMENT: &str = r#"{
        "nodes": [
            { "label": "Person", "properties": { "name": "张三", "born": 1990 } },
            { "label": "Person", "properties": { "name": "李四" } }
        ],
        "relationships": [
            { "startNodeName": "张三", "endNodeName": "李四", "relationshipType": "认识" }
        ]
    }"#;

    #[test]
    fn test_import_document() {
        let graph = GraphService::new(Arc::new(InMemoryGraphStore::new()));
        let summary = import_document(&graph, GraphDocument::from_json(DOCUMENT).unwrap()).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                nodes: 2,
                relationships: 1
            }
        );
        assert_eq!(graph.children("张三").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_endpoint_fails() {
        let graph = GraphService::new(Arc::new(InMemoryGraphStore::new()));
        let document = GraphDocument::from_json(
            r#"{ "relationships": [
                { "startNodeName": "a", "endNodeName": "b", "relationshipType": "r" }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(
            import_document(&graph, document),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_seed_skips_populated_store() {
        let graph = GraphService::new(Arc::new(InMemoryGraphStore::new()));
        let first = seed_document(&graph, GraphDocument::from_json(DOCUMENT).unwrap()).unwrap();
        assert_eq!(first.map(|s| s.nodes), Some(2));

        let second = seed_document(&graph, GraphDocument::from_json(DOCUMENT).unwrap()).unwrap();
        assert!(second.is_none());
        assert_eq!(graph.stats().unwrap().node_count, 2);
    }

    #[test]
    fn test_seed_sqlite_store_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = GraphSettings {
            backend: GraphBackendKind::Sqlite,
            path: Some(dir.path().join("graph.db")),
            seed_file: None,
        };

        for _ in 0..2 {
            let store = open_graph_store(&settings, &GraphBulkheadConfig::default()).unwrap();
            let graph = GraphService::new(store);
            seed_document(&graph, GraphDocument::from_json(DOCUMENT).unwrap()).unwrap();
        }

        let store = open_graph_store(&settings, &GraphBulkheadConfig::default()).unwrap();
        assert_eq!(store.find_exact("张三").unwrap().len(), 1);
        assert_eq!(store.stats().unwrap().node_count, 2);
        assert_eq!(store.stats().unwrap().relationship_count, 1);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            GraphDocument::from_json("[1, 2]"),
            Err(Error::InvalidInput(_))
        ));
    }
}
