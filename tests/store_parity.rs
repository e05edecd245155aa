//! Store parity tests.
//!
//! Runs the same script against the in-memory and `SQLite` stores and checks
//! that both report the same graph. Comparisons go through names, not ids.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use heritage_kg::models::{GraphRecord, Properties, PropertyValue};
use heritage_kg::storage::graph::{InMemoryGraphStore, SqliteGraphStore};
use heritage_kg::storage::{BulkheadGraphStore, GraphBulkheadConfig, GraphStore};
use tempfile::TempDir;

fn named(name: &str) -> Properties {
    let mut props = Properties::new();
    props.insert("name".to_string(), name.into());
    props
}

fn populate(store: &dyn GraphStore) {
    for name in ["张三", "李四", "王五", "鎏金铜佛像"] {
        store.create_node("Entity", named(name)).unwrap();
    }
    let mut unnamed = Properties::new();
    unnamed.insert("name".to_string(), PropertyValue::Int(42));
    store.create_node("Entity", unnamed).unwrap();

    store
        .merge_relationship("张三", "李四", "认识", Properties::new())
        .unwrap()
        .unwrap();
    store
        .merge_relationship("张三", "王五", "师从", Properties::new())
        .unwrap()
        .unwrap();
}

/// Flattens records to `(primary, type, neighbor)` name triples, sorted.
fn triples(records: &[GraphRecord]) -> Vec<(String, Option<String>, Option<String>)> {
    let mut out: Vec<_> = records
        .iter()
        .map(|r| {
            (
                r.primary.name().to_string(),
                r.relationship.as_ref().map(|rel| rel.rel_type.clone()),
                r.neighbor.as_ref().map(|n| n.name().to_string()),
            )
        })
        .collect();
    out.sort();
    out
}

fn stores(dir: &TempDir) -> Vec<(&'static str, Box<dyn GraphStore>)> {
    let memory: Box<dyn GraphStore> = Box::new(InMemoryGraphStore::new());
    let sqlite: Box<dyn GraphStore> =
        Box::new(SqliteGraphStore::new(dir.path().join("graph.db")).unwrap());
    let bulkhead: Box<dyn GraphStore> = Box::new(BulkheadGraphStore::new(
        SqliteGraphStore::in_memory().unwrap(),
        GraphBulkheadConfig::default(),
        "sqlite",
    ));
    vec![("memory", memory), ("sqlite", sqlite), ("bulkhead", bulkhead)]
}

#[test]
fn test_gateway_reads_agree() {
    let dir = TempDir::new().unwrap();
    let mut observed = Vec::new();

    for (backend, store) in stores(&dir) {
        populate(store.as_ref());

        let mut names = store.list_all_names(100).unwrap();
        names.sort();
        assert_eq!(names.len(), 4, "{backend}: integer names are not names");

        observed.push((
            backend,
            (
                names,
                triples(&store.find_exact("张三").unwrap()),
                triples(&store.find_contains("金铜", 10).unwrap()),
                triples(&store.find_with_neighbors("李四").unwrap()),
                triples(&store.find_exact("不存在").unwrap()),
            ),
        ));
    }

    let (_, expected) = &observed[0];
    assert_eq!(expected.1.len(), 2);
    for (backend, reads) in &observed[1..] {
        assert_eq!(reads, expected, "{backend} disagrees with memory");
    }
}

#[test]
fn test_directional_reads_agree() {
    let dir = TempDir::new().unwrap();
    for (backend, store) in stores(&dir) {
        populate(store.as_ref());

        let outgoing = triples(&store.outgoing("张三").unwrap());
        assert_eq!(outgoing.len(), 2, "{backend}");

        // Incoming records read parent first, like outgoing ones.
        let incoming = triples(&store.incoming("李四").unwrap());
        assert_eq!(
            incoming,
            vec![(
                "张三".to_string(),
                Some("认识".to_string()),
                Some("李四".to_string())
            )],
            "{backend}"
        );

        assert!(store.outgoing("李四").unwrap().is_empty(), "{backend}");
        assert_eq!(store.sample(1).unwrap().len(), 1, "{backend}");
    }
}

#[test]
fn test_mutations_agree() {
    let dir = TempDir::new().unwrap();
    for (backend, store) in stores(&dir) {
        populate(store.as_ref());

        let merged = store
            .merge_relationship("张三", "李四", "认识", named("ignored"))
            .unwrap()
            .unwrap();
        assert!(merged.was_updated, "{backend}");
        assert!(
            store
                .merge_relationship("张三", "无名", "认识", Properties::new())
                .unwrap()
                .is_none(),
            "{backend}"
        );

        let mut patch = Properties::new();
        patch.insert("dynasty".to_string(), "明".into());
        let updated = store.update_node("王五", patch).unwrap().unwrap();
        assert_eq!(
            updated.property("dynasty").and_then(PropertyValue::as_str),
            Some("明"),
            "{backend}"
        );
        assert!(store.update_node("无名", Properties::new()).unwrap().is_none());

        assert_eq!(store.delete_relationships("张三", "王五", "师从").unwrap(), 1);
        assert_eq!(store.delete_relationships("张三", "王五", "师从").unwrap(), 0);

        let summary = store.delete_node("张三").unwrap();
        assert_eq!(summary.nodes_deleted, 1, "{backend}");
        assert_eq!(summary.relationships_deleted, 1, "{backend}");

        let stats = store.stats().unwrap();
        assert_eq!(stats.node_count, 4, "{backend}");
        assert_eq!(stats.relationship_count, 0, "{backend}");
    }
}

#[test]
fn test_sqlite_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("persist.db");
    {
        let store = SqliteGraphStore::new(&path).unwrap();
        populate(&store);
    }

    let store = SqliteGraphStore::new(&path).unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.relationship_count, 2);
    assert_eq!(triples(&store.outgoing("张三").unwrap()).len(), 2);
}
