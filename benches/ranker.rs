//! Benchmarks for candidate ranking.
//!
//! The edit-distance and pinyin stages score every name in the pool, so
//! their cost grows with pool size:
//! - 100 names
//! - 1,000 names (the default pool limit)
//! - 10,000 names

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use heritage_kg::models::Properties;
use heritage_kg::services::fuzzy::{CandidateRanker, FuzzyResolver, RankerConfig, ResolverConfig};
use heritage_kg::storage::GraphStore;
use heritage_kg::storage::graph::InMemoryGraphStore;
use std::hint::black_box;

const SYLLABLES: &[char] = &[
    '鎏', '金', '铜', '佛', '像', '青', '花', '瓷', '瓶', '白', '玉', '壶', '天', '王', '盘',
    '碗', '张', '三', '李', '四',
];

/// Deterministic pseudo-names of 3 to 6 characters.
fn name_pool(size: usize) -> Vec<String> {
    (0..size)
        .map(|i| {
            let len = 3 + i % 4;
            (0..len)
                .map(|j| SYLLABLES[(i * 7 + j * 13 + i / 5) % SYLLABLES.len()])
                .collect()
        })
        .collect()
}

fn bench_edit_distance(c: &mut Criterion) {
    let ranker = CandidateRanker::new(RankerConfig::default());
    let mut group = c.benchmark_group("rank_by_edit_distance");

    for size in [100, 1_000, 10_000] {
        let pool = name_pool(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| ranker.rank_by_edit_distance(black_box("鎏金铜佛"), pool));
        });
    }

    group.finish();
}

fn bench_phonetic(c: &mut Criterion) {
    let ranker = CandidateRanker::new(RankerConfig::default());
    let mut group = c.benchmark_group("rank_by_phonetic");

    for size in [100, 1_000, 10_000] {
        let pool = name_pool(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| ranker.rank_by_phonetic(black_box("刘金同佛象"), pool));
        });
    }

    group.finish();
}

/// Full cascade falling through to the last stage.
fn bench_resolve_miss(c: &mut Criterion) {
    let store = InMemoryGraphStore::new();
    for name in name_pool(1_000) {
        let mut props = Properties::new();
        props.insert("name".to_string(), name.into());
        store.create_node("Entity", props).unwrap();
    }
    let resolver = FuzzyResolver::new(&store, ResolverConfig::default());

    c.bench_function("resolve_miss_1000", |b| {
        b.iter(|| resolver.resolve(black_box("故宫博物院")).unwrap());
    });
}

criterion_group!(benches, bench_edit_distance, bench_phonetic, bench_resolve_miss);
criterion_main!(benches);
