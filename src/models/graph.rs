// Allow non-const functions for accessors that borrow through Option.
#![allow(clippy::missing_const_for_fn)]

//! Property-graph types.
//!
//! Entities (nodes) and relationships are owned by the graph store. The
//! resolution core only ever reads them, one request at a time.
//!
//! # Example
//!
//! ```rust
//! use heritage_kg::models::{Entity, EntityId, PropertyValue};
//!
//! let bronze = Entity::new(EntityId::new("7"), ["Artifact"])
//!     .with_property("name", "鎏金铜佛像")
//!     .with_property("dynasty", "明");
//!
//! assert_eq!(bronze.name(), "鎏金铜佛像");
//! assert_eq!(bronze.property("dynasty"), Some(&PropertyValue::from("明")));
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property key holding an entity's display name.
pub const NAME_PROPERTY: &str = "name";

/// Display name used when an entity has no string `name` property.
pub const UNNAMED: &str = "unnamed";

/// Property map of an entity or relationship.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Store-native identifier of an entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new entity ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the entity ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Store-native identifier of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(String);

impl RelationshipId {
    /// Creates a new relationship ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the relationship ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RelationshipId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A scalar property value.
///
/// Nested objects, arrays and `null` are not representable; they are
/// rejected at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
}

impl PropertyValue {
    /// Returns the value as a string slice if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl TryFrom<serde_json::Value> for PropertyValue {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| Error::InvalidInput(format!("unsupported number: {n}"))),
            Value::Null => Err(Error::InvalidInput(
                "null property values are not supported".to_string(),
            )),
            Value::Array(_) | Value::Object(_) => Err(Error::InvalidInput(
                "property values must be scalars".to_string(),
            )),
        }
    }
}

/// Converts a JSON object into a scalar property map.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if any value is not a scalar.
pub fn properties_from_json(map: serde_json::Map<String, serde_json::Value>) -> Result<Properties> {
    map.into_iter()
        .map(|(key, value)| {
            PropertyValue::try_from(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| Error::InvalidInput(format!("property '{key}': {e}")))
        })
        .collect()
}

/// A node in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Store-native identifier.
    pub id: EntityId,
    /// Node labels.
    pub labels: Vec<String>,
    /// Scalar properties.
    pub properties: Properties,
}

impl Entity {
    /// Creates an entity with the given labels and no properties.
    #[must_use]
    pub fn new<I, S>(id: EntityId, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            labels: labels.into_iter().map(Into::into).collect(),
            properties: Properties::new(),
        }
    }

    /// Adds or replaces a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the `name` property if it is a string.
    #[must_use]
    pub fn name_property(&self) -> Option<&str> {
        self.properties.get(NAME_PROPERTY).and_then(PropertyValue::as_str)
    }

    /// Returns the display name, or [`UNNAMED`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.name_property().unwrap_or(UNNAMED)
    }

    /// Returns true if the entity's `name` property equals `name` exactly.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name_property() == Some(name)
    }

    /// Returns a property by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Store-native identifier.
    pub id: RelationshipId,
    /// Relationship type, e.g. `收藏于`.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Start entity.
    pub start: EntityId,
    /// End entity.
    pub end: EntityId,
    /// Scalar properties.
    pub properties: Properties,
}

impl Relationship {
    /// Creates a relationship with no properties.
    #[must_use]
    pub fn new(id: RelationshipId, rel_type: impl Into<String>, start: EntityId, end: EntityId) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            start,
            end,
            properties: Properties::new(),
        }
    }

    /// Returns true if either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &EntityId) -> bool {
        self.start == *id || self.end == *id
    }

    /// Returns the endpoint opposite to `id`, if `id` is an endpoint.
    #[must_use]
    pub fn other_end(&self, id: &EntityId) -> Option<&EntityId> {
        if self.start == *id {
            Some(&self.end)
        } else if self.end == *id {
            Some(&self.start)
        } else {
            None
        }
    }
}

/// One row of a one-hop expansion.
///
/// A node without relationships still yields one record with neither a
/// relationship nor a neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRecord {
    /// The matched entity.
    pub primary: Entity,
    /// The adjacent relationship, if any.
    pub relationship: Option<Relationship>,
    /// The entity at the other end of `relationship`.
    pub neighbor: Option<Entity>,
}

impl GraphRecord {
    /// A record for an entity with no expansion.
    #[must_use]
    pub const fn isolated(primary: Entity) -> Self {
        Self {
            primary,
            relationship: None,
            neighbor: None,
        }
    }

    /// A record for one hop `primary -[relationship]- neighbor`.
    #[must_use]
    pub const fn hop(primary: Entity, relationship: Relationship, neighbor: Entity) -> Self {
        Self {
            primary,
            relationship: Some(relationship),
            neighbor: Some(neighbor),
        }
    }

    /// Projects the record into the legacy `{node1, relationship, node2}` row.
    #[must_use]
    pub fn to_view(&self) -> RecordView {
        RecordView {
            node1: Some(self.primary.properties.clone()),
            relationship: self.relationship.as_ref().map(|r| r.rel_type.clone()),
            node2: self.neighbor.as_ref().map(|n| n.properties.clone()),
        }
    }
}

/// Legacy row shape returned by the browse endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    /// Properties of the first node.
    pub node1: Option<Properties>,
    /// Relationship type between the nodes.
    pub relationship: Option<String>,
    /// Properties of the second node.
    pub node2: Option<Properties>,
}

/// Outcome of a detach-delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    /// Number of nodes removed.
    pub nodes_deleted: usize,
    /// Number of relationships removed alongside them.
    pub relationships_deleted: usize,
}

/// Outcome of a relationship merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The created or updated relationship.
    pub relationship: Relationship,
    /// True if the relationship already existed and its properties were merged.
    pub was_updated: bool,
}

/// Store size counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of relationships.
    pub relationship_count: usize,
}
