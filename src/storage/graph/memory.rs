//! In-memory graph store.
//!
//! Provides a fast, non-persistent implementation of [`GraphStore`] for use
//! in tests, development, and the CLI's one-shot commands.

use crate::models::{
    DeleteSummary, Entity, EntityId, GraphRecord, GraphStats, MergeOutcome, Properties,
    Relationship, RelationshipId,
};
use crate::storage::traits::{GraphGateway, GraphStore};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Graph contents behind the lock.
///
/// Keys are allocated monotonically, so map order is insertion order.
#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<u64, Entity>,
    relationships: BTreeMap<u64, Relationship>,
    next_node_id: u64,
    next_relationship_id: u64,
}

impl GraphData {
    fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.nodes.values().filter(move |e| e.has_name(name))
    }

    fn node(&self, id: &EntityId) -> Option<&Entity> {
        id.as_str()
            .parse::<u64>()
            .ok()
            .and_then(|key| self.nodes.get(&key))
    }

    /// One-hop expansion of `entity` in both directions.
    fn expand(&self, entity: &Entity, out: &mut Vec<GraphRecord>) {
        let before = out.len();
        for rel in self.relationships.values().filter(|r| r.touches(&entity.id)) {
            let neighbor = rel.other_end(&entity.id).and_then(|id| self.node(id));
            if let Some(neighbor) = neighbor {
                out.push(GraphRecord::hop(entity.clone(), rel.clone(), neighbor.clone()));
            }
        }
        if out.len() == before {
            out.push(GraphRecord::isolated(entity.clone()));
        }
    }

    fn outgoing_of(&self, entity: &Entity, out: &mut Vec<GraphRecord>) {
        for rel in self.relationships.values().filter(|r| r.start == entity.id) {
            if let Some(child) = self.node(&rel.end) {
                out.push(GraphRecord::hop(entity.clone(), rel.clone(), child.clone()));
            }
        }
    }
}

/// In-memory graph store.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Data is not persisted between runs.
///
/// # Example
///
/// ```rust
/// use heritage_kg::models::Properties;
/// use heritage_kg::storage::graph::InMemoryGraphStore;
/// use heritage_kg::storage::{GraphGateway, GraphStore};
///
/// let store = InMemoryGraphStore::new();
/// let mut props = Properties::new();
/// props.insert("name".to_string(), "青花瓷瓶".into());
/// store.create_node("Artifact", props)?;
///
/// assert_eq!(store.list_all_names(10)?, vec!["青花瓷瓶".to_string()]);
/// # Ok::<(), heritage_kg::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    data: RwLock<GraphData>,
}

impl InMemoryGraphStore {
    /// Creates a new empty in-memory graph store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &str) -> Result<RwLockReadGuard<'_, GraphData>> {
        self.data
            .read()
            .map_err(|_| Error::gateway(operation, "lock poisoned"))
    }

    fn write(&self, operation: &str) -> Result<RwLockWriteGuard<'_, GraphData>> {
        self.data
            .write()
            .map_err(|_| Error::gateway(operation, "lock poisoned"))
    }
}

impl GraphGateway for InMemoryGraphStore {
    fn find_exact(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let data = self.read("find_exact")?;
        let mut records = Vec::new();
        for entity in data.nodes_named(name) {
            data.expand(entity, &mut records);
        }
        Ok(records)
    }

    fn find_contains(&self, substring: &str, limit: usize) -> Result<Vec<GraphRecord>> {
        let data = self.read("find_contains")?;
        let mut records = Vec::new();
        let matching = data
            .nodes
            .values()
            .filter(|e| e.name_property().is_some_and(|n| n.contains(substring)));
        for entity in matching {
            if records.len() >= limit {
                break;
            }
            data.expand(entity, &mut records);
        }
        records.truncate(limit);
        Ok(records)
    }

    fn list_all_names(&self, limit: usize) -> Result<Vec<String>> {
        let data = self.read("list_all_names")?;
        Ok(data
            .nodes
            .values()
            .filter_map(Entity::name_property)
            .take(limit)
            .map(str::to_string)
            .collect())
    }

    fn find_with_neighbors(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let data = self.read("find_with_neighbors")?;
        let mut records = Vec::new();
        for entity in data.nodes_named(name) {
            data.expand(entity, &mut records);
        }
        Ok(records)
    }
}

impl GraphStore for InMemoryGraphStore {
    fn sample(&self, limit: usize) -> Result<Vec<GraphRecord>> {
        let data = self.read("sample")?;
        let mut records = Vec::new();
        for entity in data.nodes.values() {
            if records.len() >= limit {
                break;
            }
            data.outgoing_of(entity, &mut records);
        }
        records.truncate(limit);
        Ok(records)
    }

    fn outgoing(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let data = self.read("outgoing")?;
        let mut records = Vec::new();
        for entity in data.nodes_named(name) {
            data.outgoing_of(entity, &mut records);
        }
        Ok(records)
    }

    fn incoming(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let data = self.read("incoming")?;
        let mut records = Vec::new();
        for child in data.nodes_named(name) {
            for rel in data.relationships.values().filter(|r| r.end == child.id) {
                if let Some(parent) = data.node(&rel.start) {
                    records.push(GraphRecord::hop(parent.clone(), rel.clone(), child.clone()));
                }
            }
        }
        Ok(records)
    }

    fn create_node(&self, label: &str, properties: Properties) -> Result<Entity> {
        let mut data = self.write("create_node")?;
        data.next_node_id += 1;
        let key = data.next_node_id;
        let entity = Entity {
            id: EntityId::new(key.to_string()),
            labels: vec![label.to_string()],
            properties,
        };
        data.nodes.insert(key, entity.clone());
        Ok(entity)
    }

    fn update_node(&self, name: &str, properties: Properties) -> Result<Option<Entity>> {
        let mut data = self.write("update_node")?;
        let mut first = None;
        for entity in data.nodes.values_mut().filter(|e| e.has_name(name)) {
            entity
                .properties
                .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            if first.is_none() {
                first = Some(entity.clone());
            }
        }
        Ok(first)
    }

    fn delete_node(&self, name: &str) -> Result<DeleteSummary> {
        let mut data = self.write("delete_node")?;
        let doomed: Vec<u64> = data
            .nodes
            .iter()
            .filter(|(_, e)| e.has_name(name))
            .map(|(k, _)| *k)
            .collect();
        if doomed.is_empty() {
            return Ok(DeleteSummary::default());
        }

        let ids: Vec<EntityId> = doomed.iter().map(|k| EntityId::new(k.to_string())).collect();
        let before = data.relationships.len();
        data.relationships
            .retain(|_, r| !ids.iter().any(|id| r.touches(id)));
        let relationships_deleted = before - data.relationships.len();

        for key in &doomed {
            data.nodes.remove(key);
        }

        Ok(DeleteSummary {
            nodes_deleted: doomed.len(),
            relationships_deleted,
        })
    }

    fn merge_relationship(
        &self,
        start: &str,
        end: &str,
        rel_type: &str,
        properties: Properties,
    ) -> Result<Option<MergeOutcome>> {
        let mut data = self.write("merge_relationship")?;
        let start_id = data.nodes_named(start).next().map(|e| e.id.clone());
        let end_id = data.nodes_named(end).next().map(|e| e.id.clone());
        let (Some(start_id), Some(end_id)) = (start_id, end_id) else {
            return Ok(None);
        };

        let existing = data
            .relationships
            .values_mut()
            .find(|r| r.start == start_id && r.end == end_id && r.rel_type == rel_type);
        if let Some(rel) = existing {
            rel.properties.extend(properties);
            return Ok(Some(MergeOutcome {
                relationship: rel.clone(),
                was_updated: true,
            }));
        }

        data.next_relationship_id += 1;
        let key = data.next_relationship_id;
        let mut rel = Relationship::new(
            RelationshipId::new(key.to_string()),
            rel_type,
            start_id,
            end_id,
        );
        rel.properties = properties;
        data.relationships.insert(key, rel.clone());
        Ok(Some(MergeOutcome {
            relationship: rel,
            was_updated: false,
        }))
    }

    fn delete_relationships(&self, start: &str, end: &str, rel_type: &str) -> Result<usize> {
        let mut data = self.write("delete_relationships")?;
        let starts: Vec<EntityId> = data.nodes_named(start).map(|e| e.id.clone()).collect();
        let ends: Vec<EntityId> = data.nodes_named(end).map(|e| e.id.clone()).collect();
        let before = data.relationships.len();
        data.relationships.retain(|_, r| {
            !(r.rel_type == rel_type && starts.contains(&r.start) && ends.contains(&r.end))
        });
        Ok(before - data.relationships.len())
    }

    fn stats(&self) -> Result<GraphStats> {
        let data = self.read("stats")?;
        Ok(GraphStats {
            node_count: data.nodes.len(),
            relationship_count: data.relationships.len(),
        })
    }
}
