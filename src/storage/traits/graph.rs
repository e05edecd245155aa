//! Graph gateway and store traits.
//!
//! The fuzzy resolver only ever reads the graph through [`GraphGateway`]'s
//! four operations. [`GraphStore`] extends it with the browse and CRUD
//! operations the HTTP API passes through.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | `InMemoryGraphStore` | Testing, dev | Fast, no persistence |
//! | `SqliteGraphStore` | Default; embedded | WAL, cascading deletes |
//! | `BulkheadGraphStore` | Wrapper | Concurrency cap, per-call deadline |
//!
//! # Expansion Semantics
//!
//! | Operation | Direction | Isolated node |
//! |-----------|-----------|---------------|
//! | `find_exact` | both | one record, no relationship |
//! | `find_contains` | both | one record, no relationship |
//! | `find_with_neighbors` | both | one record, no relationship |
//! | `outgoing` / `sample` | start → end | omitted |
//! | `incoming` | end → start | omitted |
//!
//! Name matching is case-sensitive and only considers string `name`
//! properties.
//!
//! # Errors
//!
//! Store failures are reported as [`crate::Error::Gateway`]. Missing nodes in
//! read operations are not errors; they yield empty results.

use crate::Result;
use crate::models::{
    DeleteSummary, Entity, GraphRecord, GraphStats, MergeOutcome, Properties,
};

/// Read operations the fuzzy resolver depends on.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn GraphStore>`
/// - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
/// - Records for one primary node must be contiguous
pub trait GraphGateway: Send + Sync {
    /// Finds nodes whose name equals `name`, with their one-hop expansion.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn find_exact(&self, name: &str) -> Result<Vec<GraphRecord>>;

    /// Finds nodes whose name contains `substring`, with their one-hop
    /// expansion, capped at `limit` records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn find_contains(&self, substring: &str, limit: usize) -> Result<Vec<GraphRecord>>;

    /// Lists up to `limit` string node names.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn list_all_names(&self, limit: usize) -> Result<Vec<String>>;

    /// Fetches the full one-hop expansion of nodes named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn find_with_neighbors(&self, name: &str) -> Result<Vec<GraphRecord>>;
}

/// A graph store with browse and CRUD operations.
pub trait GraphStore: GraphGateway {
    /// Returns up to `limit` outgoing one-hop records across the graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn sample(&self, limit: usize) -> Result<Vec<GraphRecord>>;

    /// Returns records `name -[r]-> m` for every outgoing relationship.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn outgoing(&self, name: &str) -> Result<Vec<GraphRecord>>;

    /// Returns records `p -[r]-> name` for every incoming relationship.
    ///
    /// The parent `p` is the record's primary entity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn incoming(&self, name: &str) -> Result<Vec<GraphRecord>>;

    /// Creates a node with a single label.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be written.
    fn create_node(&self, label: &str, properties: Properties) -> Result<Entity>;

    /// Merges `properties` into every node named `name`.
    ///
    /// Returns the first updated node, or `None` if no node has that name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be written.
    fn update_node(&self, name: &str, properties: Properties) -> Result<Option<Entity>>;

    /// Deletes every node named `name` together with its relationships.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be written.
    fn delete_node(&self, name: &str) -> Result<DeleteSummary>;

    /// Creates `start -[rel_type]-> end`, or merges `properties` into it if it
    /// already exists.
    ///
    /// Returns `None` if either endpoint does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be written.
    fn merge_relationship(
        &self,
        start: &str,
        end: &str,
        rel_type: &str,
        properties: Properties,
    ) -> Result<Option<MergeOutcome>>;

    /// Deletes every `start -[rel_type]-> end` relationship.
    ///
    /// Returns the number of relationships deleted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be written.
    fn delete_relationships(&self, start: &str, end: &str, rel_type: &str) -> Result<usize>;

    /// Returns node and relationship counts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the store cannot be read.
    fn stats(&self) -> Result<GraphStats>;
}
