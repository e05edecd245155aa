//! The four-stage resolution cascade.
//!
//! ```text
//! query ─► exact ─► contains ─► edit distance ─► pinyin ─► []
//!            │          │             │              │
//!            └─ hit ────┴──── hit ────┴──── hit ─────┴─► results
//! ```
//!
//! Each stage runs only when every stage before it produced nothing. Gateway
//! failures never escape: a failed stage counts as empty and the cascade
//! moves on, so a total outage resolves to an empty result set.

use super::ranker::{CandidateRanker, RankerConfig};
use crate::models::{GraphRecord, MatchCandidate, MatchType, SearchResult};
use crate::storage::GraphGateway;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;

/// Resolver limits and fixed stage scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Record cap for the contains stage.
    pub contains_limit: usize,
    /// Name pool size for the ranked stages.
    pub name_pool_limit: usize,
    /// Score of exact matches.
    pub exact_score: f64,
    /// Score of contains matches.
    pub contains_score: f64,
    /// Ranked-stage thresholds.
    #[serde(flatten)]
    pub ranker: RankerConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            contains_limit: 10,
            name_pool_limit: 1000,
            exact_score: 1.0,
            contains_score: 0.8,
            ranker: RankerConfig::default(),
        }
    }
}

/// Resolves an imprecise mention to scored graph records.
pub struct FuzzyResolver<'a, G: GraphGateway + ?Sized> {
    gateway: &'a G,
    config: ResolverConfig,
    ranker: CandidateRanker,
}

impl<'a, G: GraphGateway + ?Sized> FuzzyResolver<'a, G> {
    /// Creates a resolver over `gateway`.
    #[must_use]
    pub fn new(gateway: &'a G, config: ResolverConfig) -> Self {
        let ranker = CandidateRanker::new(config.ranker.clone());
        Self {
            gateway,
            config,
            ranker,
        }
    }

    /// Runs the cascade for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `query` is empty or whitespace only.
    /// No gateway call is made in that case. Gateway errors are absorbed.
    #[instrument(skip(self), fields(stage = tracing::field::Empty, matches = tracing::field::Empty))]
    pub fn resolve(&self, query: &str) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }

        let start = Instant::now();
        let (stage, results) = self.run_cascade(query);

        let span = tracing::Span::current();
        span.record("stage", stage);
        span.record("matches", results.len());

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("resolver_duration_ms", "stage" => stage).record(elapsed_ms);
        metrics::counter!("resolver_resolutions_total", "stage" => stage).increment(1);
        tracing::debug!(stage, matches = results.len(), "Resolution finished");

        Ok(results)
    }

    fn run_cascade(&self, query: &str) -> (&'static str, Vec<SearchResult>) {
        let exact = self.stage("exact", || self.gateway.find_exact(query));
        if !exact.is_empty() {
            return ("exact", Self::score(exact, self.config.exact_score, MatchType::Exact));
        }

        let contains = self.stage("contains", || {
            self.gateway.find_contains(query, self.config.contains_limit)
        });
        if !contains.is_empty() {
            return (
                "contains",
                Self::score(contains, self.config.contains_score, MatchType::Contains),
            );
        }

        let pool = self.stage("edit_distance", || {
            self.gateway.list_all_names(self.config.name_pool_limit)
        });
        let candidates = self.ranker.rank_by_edit_distance(query, &pool);
        let edit = self.expand(candidates, MatchType::EditDistance);
        if !edit.is_empty() {
            return ("edit_distance", edit);
        }

        // The pool is fetched again so a transient failure above does not
        // also starve the last stage.
        let pool = self.stage("pinyin", || {
            self.gateway.list_all_names(self.config.name_pool_limit)
        });
        let candidates = self.ranker.rank_by_phonetic(query, &pool);
        let pinyin = self.expand(candidates, MatchType::Pinyin);
        if !pinyin.is_empty() {
            return ("pinyin", pinyin);
        }

        ("none", Vec::new())
    }

    /// Runs one gateway call, treating failure as an empty result.
    fn stage<T>(&self, stage: &'static str, call: impl FnOnce() -> Result<Vec<T>>) -> Vec<T> {
        match call() {
            Ok(items) => {
                let outcome = if items.is_empty() { "miss" } else { "hit" };
                metrics::counter!("resolver_stage_total", "stage" => stage, "outcome" => outcome)
                    .increment(1);
                items
            },
            Err(e) => {
                metrics::counter!("resolver_stage_total", "stage" => stage, "outcome" => "error")
                    .increment(1);
                tracing::warn!(stage, error = %e, "Resolver stage failed, continuing cascade");
                Vec::new()
            },
        }
    }

    /// Fetches neighbors of each candidate, tagging records with its score.
    fn expand(&self, candidates: Vec<MatchCandidate>, match_type: MatchType) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for candidate in candidates {
            match self.gateway.find_with_neighbors(&candidate.entity_name) {
                Ok(records) => results.extend(records.into_iter().map(|record| {
                    SearchResult::new(record, candidate.similarity_score, match_type)
                })),
                Err(e) => {
                    metrics::counter!(
                        "resolver_candidate_errors_total",
                        "stage" => match_type.as_str()
                    )
                    .increment(1);
                    tracing::warn!(
                        candidate = %candidate.entity_name,
                        error = %e,
                        "Skipping candidate after gateway failure"
                    );
                },
            }
        }
        results
    }

    fn score(records: Vec<GraphRecord>, score: f64, match_type: MatchType) -> Vec<SearchResult> {
        records
            .into_iter()
            .map(|record| SearchResult::new(record, score, match_type))
            .collect()
    }
}
