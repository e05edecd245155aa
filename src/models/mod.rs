//! Data models.
//!
//! Graph types are read from the store per request; search types live for
//! the duration of one resolution.

pub mod graph;
mod search;

pub use graph::{
    DeleteSummary, Entity, EntityId, GraphRecord, GraphStats, MergeOutcome, NAME_PROPERTY,
    Properties, PropertyValue, RecordView, Relationship, RelationshipId, UNNAMED,
    properties_from_json,
};
pub use search::{
    MatchCandidate, MatchType, NodeView, RelationshipView, ResolvedResponse, SearchInfo,
    SearchResult,
};
