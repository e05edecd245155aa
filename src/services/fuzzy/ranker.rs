//! Candidate ranking over an already-fetched name pool.

use super::phonetic::phonetic_similarity;
use super::similarity::similarity;
use crate::models::MatchCandidate;
use serde::{Deserialize, Serialize};

/// Thresholds and cut-offs for the two ranked stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Edit-distance threshold for queries of at most `short_query_max_len` chars.
    pub edit_threshold_short: f64,
    /// Edit-distance threshold for longer queries.
    pub edit_threshold_long: f64,
    /// Longest query (in chars) that uses the short threshold.
    pub short_query_max_len: usize,
    /// Maximum edit-distance candidates.
    pub edit_top_n: usize,
    /// Phonetic similarity threshold.
    pub phonetic_threshold: f64,
    /// Maximum phonetic candidates.
    pub phonetic_top_n: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            edit_threshold_short: 0.6,
            edit_threshold_long: 0.5,
            short_query_max_len: 3,
            edit_top_n: 5,
            phonetic_threshold: 0.7,
            phonetic_top_n: 3,
        }
    }
}

impl RankerConfig {
    /// Edit-distance threshold that applies to `query`.
    #[must_use]
    pub fn edit_threshold_for(&self, query: &str) -> f64 {
        if query.chars().count() <= self.short_query_max_len {
            self.edit_threshold_short
        } else {
            self.edit_threshold_long
        }
    }
}

/// Scores, filters, sorts and truncates a name pool.
#[derive(Debug, Clone, Default)]
pub struct CandidateRanker {
    config: RankerConfig,
}

impl CandidateRanker {
    /// Creates a ranker.
    #[must_use]
    pub const fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    /// Returns the ranker configuration.
    #[must_use]
    pub const fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Ranks `pool` by edit-distance similarity to `query`.
    #[must_use]
    pub fn rank_by_edit_distance(&self, query: &str, pool: &[String]) -> Vec<MatchCandidate> {
        let threshold = self.config.edit_threshold_for(query);
        Self::rank(pool, threshold, self.config.edit_top_n, |name| {
            similarity(query, name)
        })
    }

    /// Ranks `pool` by pinyin similarity to `query`.
    #[must_use]
    pub fn rank_by_phonetic(&self, query: &str, pool: &[String]) -> Vec<MatchCandidate> {
        Self::rank(
            pool,
            self.config.phonetic_threshold,
            self.config.phonetic_top_n,
            |name| phonetic_similarity(query, name),
        )
    }

    fn rank(
        pool: &[String],
        threshold: f64,
        top_n: usize,
        score: impl Fn(&str) -> f64,
    ) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = pool
            .iter()
            .map(|name| MatchCandidate::new(name.as_str(), score(name)))
            .filter(|c| c.similarity_score >= threshold)
            .collect();
        // sort_by is stable: equal scores keep pool order.
        candidates.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        candidates.truncate(top_n);
        candidates
    }
}
