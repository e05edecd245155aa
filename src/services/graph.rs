//! Graph service for browse and CRUD operations.
//!
//! Provides a service layer wrapping [`GraphStore`] with request validation,
//! not-found reporting and duplicate-write rejection.
//!
//! # Example
//!
//! ```rust
//! use heritage_kg::models::Properties;
//! use heritage_kg::services::GraphService;
//! use heritage_kg::storage::graph::InMemoryGraphStore;
//! use std::sync::Arc;
//!
//! let service = GraphService::new(Arc::new(InMemoryGraphStore::new()));
//!
//! let mut props = Properties::new();
//! props.insert("name".to_string(), "青花瓷瓶".into());
//! service.create_node("Artifact", props)?;
//!
//! assert!(service.create_node("bad label", Properties::new()).is_err());
//! # Ok::<(), heritage_kg::Error>(())
//! ```

use crate::models::{
    DeleteSummary, Entity, GraphStats, MergeOutcome, NAME_PROPERTY, Properties, RecordView,
};
use crate::services::deduplication::{LedgerDecision, RequestLedger, RequestSignature};
use crate::storage::GraphStore;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::instrument;

/// Labels are interpolated into store queries, so only word characters pass.
static LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap_or_else(|_| unreachable!()));

/// Number of records returned by [`GraphService::sample`] by default.
pub const DEFAULT_SAMPLE_SIZE: usize = 25;

/// A request to create or merge a relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRequest {
    /// Name of the start node.
    pub start: String,
    /// Name of the end node.
    pub end: String,
    /// Relationship type.
    pub rel_type: String,
    /// Properties to set or merge.
    pub properties: Properties,
}

impl RelationshipRequest {
    fn validate(&self) -> Result<()> {
        if self.start.trim().is_empty() || self.end.trim().is_empty() || self.rel_type.trim().is_empty()
        {
            return Err(Error::InvalidInput(
                "startNodeName, endNodeName and relationshipType are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// High-level service for graph browse and CRUD.
///
/// # Thread Safety
///
/// The service is thread-safe; the store and ledger are shared via `Arc`.
#[derive(Clone)]
pub struct GraphService {
    store: Arc<dyn GraphStore>,
    ledger: Option<Arc<RequestLedger>>,
}

impl GraphService {
    /// Creates a graph service without duplicate-write rejection.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            ledger: None,
        }
    }

    /// Rejects repeated relationship writes through `ledger`.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<RequestLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Returns node and relationship counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn stats(&self) -> Result<GraphStats> {
        self.store.stats()
    }

    /// Returns up to `limit` outgoing records across the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn sample(&self, limit: usize) -> Result<Vec<RecordView>> {
        Ok(self
            .store
            .sample(limit)?
            .iter()
            .map(|r| r.to_view())
            .collect())
    }

    /// Returns the outgoing records of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `name` has no outgoing relationships.
    pub fn children(&self, name: &str) -> Result<Vec<RecordView>> {
        let records = self.store.outgoing(name)?;
        if records.is_empty() {
            return Err(Error::NotFound(format!(
                "no relationships found for node '{name}'"
            )));
        }
        Ok(records.iter().map(|r| r.to_view()).collect())
    }

    /// Returns the incoming records of `name`, parents first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `name` has no incoming relationships.
    pub fn parents(&self, name: &str) -> Result<Vec<RecordView>> {
        let records = self.store.incoming(name)?;
        if records.is_empty() {
            return Err(Error::NotFound(format!("no parent nodes found for '{name}'")));
        }
        Ok(records.iter().map(|r| r.to_view()).collect())
    }

    /// Creates a node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `label` is not `[A-Za-z0-9_]+`.
    #[instrument(skip(self, properties))]
    pub fn create_node(&self, label: &str, properties: Properties) -> Result<Entity> {
        if !LABEL_PATTERN.is_match(label) {
            return Err(Error::InvalidInput(format!(
                "label '{label}' may only contain letters, digits and underscores"
            )));
        }
        let entity = self.store.create_node(label, properties)?;
        tracing::info!(id = %entity.id, label, "Created node");
        Ok(entity)
    }

    /// Merges `properties` into the node named `name`.
    ///
    /// Setting `name` to its current value is allowed; renaming is not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty update or a rename, and
    /// [`Error::NotFound`] if no node has that name.
    #[instrument(skip(self, properties))]
    pub fn update_node(&self, name: &str, properties: Properties) -> Result<Entity> {
        if properties.is_empty() {
            return Err(Error::InvalidInput(
                "update must contain at least one property".to_string(),
            ));
        }
        if let Some(new_name) = properties.get(NAME_PROPERTY)
            && new_name.as_str() != Some(name)
        {
            return Err(Error::InvalidInput(
                "the name property cannot be changed through an update".to_string(),
            ));
        }

        self.store
            .update_node(name, properties)?
            .ok_or_else(|| Error::NotFound(format!("node '{name}'")))
    }

    /// Deletes the node named `name` and its relationships.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no node has that name.
    #[instrument(skip(self))]
    pub fn delete_node(&self, name: &str) -> Result<DeleteSummary> {
        let summary = self.store.delete_node(name)?;
        if summary.nodes_deleted == 0 {
            return Err(Error::NotFound(format!("node '{name}'")));
        }
        tracing::info!(
            nodes = summary.nodes_deleted,
            relationships = summary.relationships_deleted,
            "Deleted node"
        );
        Ok(summary)
    }

    /// Creates or merges a relationship.
    ///
    /// With a ledger attached, an identical request inside its window is
    /// rejected before touching the store. Invalid requests are rejected
    /// before the ledger sees them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for missing fields,
    /// [`Error::Duplicate`] for a repeated request and [`Error::NotFound`]
    /// if either endpoint does not exist.
    #[instrument(skip(self, request), fields(start = %request.start, rel_type = %request.rel_type, end = %request.end))]
    pub fn merge_relationship(&self, request: RelationshipRequest) -> Result<MergeOutcome> {
        request.validate()?;

        if let Some(ledger) = &self.ledger {
            let signature = RequestSignature::relationship(
                &request.start,
                &request.rel_type,
                &request.end,
                &request.properties,
            );
            if let LedgerDecision::Duplicate { age } = ledger.check_and_record(&signature) {
                return Err(Error::Duplicate(format!(
                    "identical relationship request submitted {}ms ago",
                    age.as_millis()
                )));
            }
        }

        self.store
            .merge_relationship(
                &request.start,
                &request.end,
                &request.rel_type,
                request.properties,
            )?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "start node '{}' or end node '{}'",
                    request.start, request.end
                ))
            })
    }

    /// Deletes every `start -[rel_type]-> end` relationship.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for missing fields and
    /// [`Error::NotFound`] if nothing was deleted.
    #[instrument(skip(self))]
    pub fn delete_relationships(&self, start: &str, end: &str, rel_type: &str) -> Result<usize> {
        RelationshipRequest {
            start: start.to_string(),
            end: end.to_string(),
            rel_type: rel_type.to_string(),
            properties: Properties::new(),
        }
        .validate()?;

        let deleted = self.store.delete_relationships(start, end, rel_type)?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "relationship '{rel_type}' from '{start}' to '{end}'"
            )));
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyValue;
    use crate::services::deduplication::LedgerConfig;
    use crate::storage::graph::InMemoryGraphStore;

    fn named(name: &str) -> Properties {
        let mut props = Properties::new();
        props.insert("name".to_string(), PropertyValue::from(name));
        props
    }

    fn service() -> GraphService {
        let service = GraphService::new(Arc::new(InMemoryGraphStore::new()))
            .with_ledger(Arc::new(RequestLedger::new(LedgerConfig::default())));
        service.create_node("Person", named("张三")).unwrap();
        service.create_node("Person", named("李四")).unwrap();
        service
    }

    fn knows() -> RelationshipRequest {
        RelationshipRequest {
            start: "张三".to_string(),
            end: "李四".to_string(),
            rel_type: "认识".to_string(),
            properties: Properties::new(),
        }
    }

    #[test]
    fn test_create_node_validates_label() {
        let service = service();
        assert!(matches!(
            service.create_node("Person; DROP", named("x")),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            service.create_node("", named("x")),
            Err(Error::InvalidInput(_))
        ));
        assert!(service.create_node("Cultural_Relic2", named("x")).is_ok());
    }

    #[test]
    fn test_update_rejects_rename() {
        let service = service();
        assert!(matches!(
            service.update_node("张三", named("张三丰")),
            Err(Error::InvalidInput(_))
        ));

        let mut same_name = named("张三");
        same_name.insert("born".to_string(), PropertyValue::Int(1990));
        let updated = service.update_node("张三", same_name).unwrap();
        assert_eq!(updated.property("born"), Some(&PropertyValue::Int(1990)));
    }

    #[test]
    fn test_update_missing_node() {
        let service = service();
        let mut props = Properties::new();
        props.insert("born".to_string(), PropertyValue::Int(1990));
        assert!(matches!(
            service.update_node("王五", props),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.update_node("张三", Properties::new()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_merge_relationship_rejects_duplicates() {
        let service = service();
        let first = service.merge_relationship(knows()).unwrap();
        assert!(!first.was_updated);

        assert!(matches!(
            service.merge_relationship(knows()),
            Err(Error::Duplicate(_))
        ));

        // Different properties form a different request.
        let mut with_props = knows();
        with_props
            .properties
            .insert("since".to_string(), PropertyValue::Int(2001));
        assert!(service.merge_relationship(with_props).unwrap().was_updated);
    }

    #[test]
    fn test_invalid_request_does_not_poison_ledger() {
        let service = service();
        let mut invalid = knows();
        invalid.rel_type = String::new();
        assert!(matches!(
            service.merge_relationship(invalid),
            Err(Error::InvalidInput(_))
        ));
        assert!(service.merge_relationship(knows()).is_ok());
    }

    #[test]
    fn test_merge_relationship_missing_endpoint() {
        let service = service();
        let mut request = knows();
        request.end = "王五".to_string();
        assert!(matches!(
            service.merge_relationship(request),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_browse_and_delete() {
        let service = service();
        service.merge_relationship(knows()).unwrap();

        assert_eq!(service.children("张三").unwrap().len(), 1);
        assert_eq!(service.parents("李四").unwrap().len(), 1);
        assert!(matches!(service.parents("张三"), Err(Error::NotFound(_))));
        assert_eq!(service.sample(DEFAULT_SAMPLE_SIZE).unwrap().len(), 1);

        assert_eq!(service.delete_relationships("张三", "李四", "认识").unwrap(), 1);
        assert!(matches!(
            service.delete_relationships("张三", "李四", "认识"),
            Err(Error::NotFound(_))
        ));

        assert_eq!(service.stats().unwrap().relationship_count, 0);
        let summary = service.delete_node("张三").unwrap();
        assert_eq!(summary.nodes_deleted, 1);
        assert!(matches!(service.delete_node("张三"), Err(Error::NotFound(_))));
    }
}
