//! Resolution result types and the response shape sent to clients.

use super::graph::{Entity, GraphRecord, Properties, Relationship};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a node was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Exact name equality.
    Exact,
    /// Name contains the query.
    Contains,
    /// Edit-distance similarity above threshold.
    EditDistance,
    /// Phonetic similarity above threshold.
    Pinyin,
    /// Not matched itself; adjacent to a matched node.
    Related,
}

impl MatchType {
    /// Returns the match type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::EditDistance => "edit_distance",
            Self::Pinyin => "pinyin",
            Self::Related => "related",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pool name that survived ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// The candidate's name.
    pub entity_name: String,
    /// Similarity to the query, in `[0, 1]`.
    pub similarity_score: f64,
}

impl MatchCandidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(entity_name: impl Into<String>, similarity_score: f64) -> Self {
        Self {
            entity_name: entity_name.into(),
            similarity_score,
        }
    }
}

/// One scored record produced by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The underlying graph record.
    pub record: GraphRecord,
    /// Match score in `[0, 1]`.
    pub score: f64,
    /// Which stage produced it.
    pub match_type: MatchType,
}

impl SearchResult {
    /// Creates a search result.
    #[must_use]
    pub const fn new(record: GraphRecord, score: f64, match_type: MatchType) -> Self {
        Self {
            record,
            score,
            match_type,
        }
    }
}

/// Node entry of a [`ResolvedResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    /// Entity identifier.
    pub id: String,
    /// Entity labels.
    pub labels: Vec<String>,
    /// Display name.
    pub name: String,
    /// Entity properties.
    pub properties: Properties,
    /// Best score recorded for this node.
    pub match_score: f64,
    /// Match type recorded with that score.
    pub match_type: MatchType,
}

impl NodeView {
    /// Builds a view of `entity` tagged with a score and match type.
    #[must_use]
    pub fn from_entity(entity: &Entity, match_score: f64, match_type: MatchType) -> Self {
        Self {
            id: entity.id.to_string(),
            labels: entity.labels.clone(),
            name: entity.name().to_string(),
            properties: entity.properties.clone(),
            match_score,
            match_type,
        }
    }
}

/// Relationship entry of a [`ResolvedResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipView {
    /// Relationship identifier.
    pub id: String,
    /// Relationship type.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Start entity identifier.
    pub start_node: String,
    /// End entity identifier.
    pub end_node: String,
    /// Relationship properties.
    pub properties: Properties,
}

impl From<&Relationship> for RelationshipView {
    fn from(rel: &Relationship) -> Self {
        Self {
            id: rel.id.to_string(),
            rel_type: rel.rel_type.clone(),
            start_node: rel.start.to_string(),
            end_node: rel.end.to_string(),
            properties: rel.properties.clone(),
        }
    }
}

/// Metadata about a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInfo {
    /// The query that was resolved.
    pub original_query: String,
    /// Number of scored records.
    pub total_matches: usize,
    /// Distinct match types, in first-seen order.
    pub match_types: Vec<MatchType>,
    /// Score threshold applied, for fuzzy-search responses.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub threshold: Option<f64>,
}

/// Deduplicated, sorted resolution response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResponse {
    /// Matched and related nodes, best score first.
    pub nodes: Vec<NodeView>,
    /// Relationships seen in the matched records.
    pub relationships: Vec<RelationshipView>,
    /// Resolution metadata.
    pub search_info: SearchInfo,
}

impl ResolvedResponse {
    /// An empty response for `query`.
    #[must_use]
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            relationships: Vec::new(),
            search_info: SearchInfo {
                original_query: query.into(),
                total_matches: 0,
                match_types: Vec::new(),
                threshold: None,
            },
        }
    }

    /// Returns true if no node was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
