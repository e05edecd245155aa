//! Property-based tests for the matching primitives.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Edit distance agrees with an independent Levenshtein implementation
//! - Similarity is bounded, symmetric and reflexive
//! - Full similarity means equal strings
//! - Pinyin transcription leaves unmapped text alone
//! - Ranked candidates are thresholded, bounded and sorted
//! - Entity extraction never yields an empty mention

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use heritage_kg::services::SearchService;
use heritage_kg::services::fuzzy::{
    CandidateRanker, RankerConfig, edit_distance, phonetic_similarity, similarity, to_phonetic,
};
use proptest::prelude::*;

/// Short strings over a mix of heritage characters, their homophones and ASCII.
fn mention() -> impl Strategy<Value = String> {
    "[张三丰李四鎏六刘金铜同佛像象青花瓷词a-c]{0,8}"
}

proptest! {
    /// Property: edit distance matches `strsim`'s char-based Levenshtein.
    #[test]
    fn prop_edit_distance_matches_oracle(a in mention(), b in mention()) {
        prop_assert_eq!(edit_distance(&a, &b), strsim::levenshtein(&a, &b));
    }

    /// Property: similarity matches `strsim`'s normalized Levenshtein.
    #[test]
    fn prop_similarity_matches_oracle(a in mention(), b in mention()) {
        let expected = strsim::normalized_levenshtein(&a, &b);
        prop_assert!((similarity(&a, &b) - expected).abs() < 1e-9);
    }

    /// Property: similarity is within [0, 1] and symmetric.
    #[test]
    fn prop_similarity_bounded_and_symmetric(a in mention(), b in mention()) {
        let ab = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert!((ab - similarity(&b, &a)).abs() < f64::EPSILON);
    }

    /// Property: every string is fully similar to itself.
    #[test]
    fn prop_similarity_reflexive(a in mention()) {
        prop_assert!((similarity(&a, &a) - 1.0).abs() < f64::EPSILON);
        prop_assert!((phonetic_similarity(&a, &a) - 1.0).abs() < f64::EPSILON);
    }

    /// Property: similarity reaches 1.0 only for identical strings.
    #[test]
    fn prop_full_similarity_only_for_equal_strings(a in mention(), b in mention()) {
        prop_assert_eq!((similarity(&a, &b) - 1.0).abs() < f64::EPSILON, a == b);
    }

    /// Property: text without table characters transcribes to itself.
    #[test]
    fn prop_unmapped_text_unchanged(s in "[a-zA-Z0-9 故宫敦煌]{0,20}") {
        prop_assert_eq!(to_phonetic(&s), s);
    }

    /// Property: ranked candidates clear the threshold, respect top-N and
    /// come out in descending score order.
    #[test]
    fn prop_ranking_is_thresholded_and_sorted(
        query in "[张三丰李四鎏金铜佛像]{1,6}",
        pool in prop::collection::vec(mention(), 0..30),
    ) {
        let config = RankerConfig::default();
        let ranker = CandidateRanker::new(config.clone());

        let edit = ranker.rank_by_edit_distance(&query, &pool);
        let threshold = config.edit_threshold_for(&query);
        prop_assert!(edit.len() <= config.edit_top_n);
        prop_assert!(edit.iter().all(|c| c.similarity_score >= threshold));
        prop_assert!(edit.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));

        let phonetic = ranker.rank_by_phonetic(&query, &pool);
        prop_assert!(phonetic.len() <= config.phonetic_top_n);
        prop_assert!(phonetic.iter().all(|c| c.similarity_score >= config.phonetic_threshold));
        prop_assert!(phonetic
            .windows(2)
            .all(|w| w[0].similarity_score >= w[1].similarity_score));
    }

    /// Property: a non-blank question always yields a non-blank mention.
    #[test]
    fn prop_extract_entity_never_empty(question in "[张三李四 ？?是谁什么有哪些]{1,12}") {
        prop_assume!(!question.trim().is_empty());
        let entity = SearchService::extract_entity(&question).unwrap();
        prop_assert!(!entity.trim().is_empty());
    }
}
