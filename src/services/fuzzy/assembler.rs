//! Folds scored records into the client response.

use crate::models::{
    Entity, MatchType, NodeView, RelationshipView, ResolvedResponse, SearchInfo, SearchResult,
};
use std::collections::{HashMap, HashSet};

/// Insertion-ordered node collection keyed by entity id.
#[derive(Default)]
struct NodeSet {
    nodes: Vec<NodeView>,
    index: HashMap<String, usize>,
}

impl NodeSet {
    /// Registers `entity` unless already present. First occurrence wins.
    fn register(&mut self, entity: &Entity, score: f64, match_type: MatchType) {
        let id = entity.id.to_string();
        if self.index.contains_key(&id) {
            return;
        }
        self.index.insert(id, self.nodes.len());
        self.nodes
            .push(NodeView::from_entity(entity, score, match_type));
    }

    /// Nodes sorted by score descending; ties keep insertion order.
    fn into_sorted(mut self) -> Vec<NodeView> {
        self.nodes
            .sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
        self.nodes
    }
}

fn distinct_match_types<'a>(results: impl Iterator<Item = &'a SearchResult>) -> Vec<MatchType> {
    let mut seen = Vec::new();
    for result in results {
        if !seen.contains(&result.match_type) {
            seen.push(result.match_type);
        }
    }
    seen
}

/// Builds [`ResolvedResponse`]s from resolver output.
pub struct ResultAssembler;

impl ResultAssembler {
    /// Deduplicates nodes and relationships and sorts nodes by score.
    ///
    /// Primary entities keep the score of the first result that carried
    /// them. Neighbors not matched themselves are added with score 0 and
    /// type `related`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use heritage_kg::models::{Entity, EntityId, GraphRecord, MatchType, SearchResult};
    /// use heritage_kg::services::fuzzy::ResultAssembler;
    ///
    /// let zhang = Entity::new(EntityId::new("1"), ["Person"]).with_property("name", "张三");
    /// let results = vec![SearchResult::new(GraphRecord::isolated(zhang), 1.0, MatchType::Exact)];
    ///
    /// let response = ResultAssembler::assemble("张三", &results);
    /// assert_eq!(response.nodes.len(), 1);
    /// assert_eq!(response.search_info.match_types, vec![MatchType::Exact]);
    /// ```
    #[must_use]
    pub fn assemble(query: &str, results: &[SearchResult]) -> ResolvedResponse {
        let mut nodes = NodeSet::default();
        let mut relationships = Vec::new();
        let mut seen_relationships = HashSet::new();

        for result in results {
            let record = &result.record;
            nodes.register(&record.primary, result.score, result.match_type);
            if let Some(neighbor) = &record.neighbor {
                nodes.register(neighbor, 0.0, MatchType::Related);
            }
            if let Some(rel) = &record.relationship
                && seen_relationships.insert(rel.id.clone())
            {
                relationships.push(RelationshipView::from(rel));
            }
        }

        ResolvedResponse {
            nodes: nodes.into_sorted(),
            relationships,
            search_info: SearchInfo {
                original_query: query.to_string(),
                total_matches: results.len(),
                match_types: distinct_match_types(results.iter()),
                threshold: None,
            },
        }
    }

    /// Keeps results scoring at least `threshold` and reports only their
    /// primary entities, without relationships.
    #[must_use]
    pub fn assemble_primary_only(
        query: &str,
        results: &[SearchResult],
        threshold: f64,
    ) -> ResolvedResponse {
        let kept: Vec<&SearchResult> = results.iter().filter(|r| r.score >= threshold).collect();

        let mut nodes = NodeSet::default();
        for result in &kept {
            nodes.register(&result.record.primary, result.score, result.match_type);
        }

        ResolvedResponse {
            nodes: nodes.into_sorted(),
            relationships: Vec::new(),
            search_info: SearchInfo {
                original_query: query.to_string(),
                total_matches: kept.len(),
                match_types: distinct_match_types(kept.iter().copied()),
                threshold: Some(threshold),
            },
        }
    }
}
