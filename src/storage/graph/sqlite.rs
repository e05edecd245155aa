//! `SQLite` graph store.
//!
//! Stores nodes and relationships in two tables, with labels and properties
//! serialized as JSON. The string `name` property is mirrored into an indexed
//! column so the resolver's lookups never scan the JSON.

use crate::models::{
    DeleteSummary, Entity, EntityId, GraphRecord, GraphStats, MergeOutcome, NAME_PROPERTY,
    Properties, PropertyValue, Relationship, RelationshipId,
};
use crate::storage::traits::{GraphGateway, GraphStore};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::instrument;

/// Helper to acquire mutex lock with poison recovery.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Graph SQLite mutex was poisoned, recovering");
            metrics::counter!("graph_sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Expansion of matched nodes in both directions, isolated nodes included.
const EXPAND_SELECT: &str = "
    SELECT n.id, n.labels, n.properties,
           r.id, r.rel_type, r.start_id, r.end_id, r.properties,
           m.id, m.labels, m.properties
    FROM nodes n
    LEFT JOIN relationships r ON r.start_id = n.id OR r.end_id = n.id
    LEFT JOIN nodes m ON m.id = CASE WHEN r.start_id = n.id THEN r.end_id ELSE r.start_id END";

/// Outgoing hops only.
const OUTGOING_SELECT: &str = "
    SELECT n.id, n.labels, n.properties,
           r.id, r.rel_type, r.start_id, r.end_id, r.properties,
           m.id, m.labels, m.properties
    FROM nodes n
    JOIN relationships r ON r.start_id = n.id
    JOIN nodes m ON m.id = r.end_id";

/// Raw columns of one expansion row, decoded outside the rusqlite closure.
struct RawRecord {
    node: (i64, String, String),
    relationship: Option<(i64, String, i64, i64, String)>,
    neighbor: Option<(i64, String, String)>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let node = (row.get(0)?, row.get(1)?, row.get(2)?);
        let relationship = match row.get::<_, Option<i64>>(3)? {
            Some(id) => Some((id, row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?)),
            None => None,
        };
        let neighbor = match row.get::<_, Option<i64>>(8)? {
            Some(id) => Some((id, row.get(9)?, row.get(10)?)),
            None => None,
        };
        Ok(Self {
            node,
            relationship,
            neighbor,
        })
    }

    fn decode(self) -> Result<GraphRecord> {
        let (id, labels, props) = self.node;
        let primary = decode_entity(id, &labels, &props)?;
        let relationship = self
            .relationship
            .map(|(id, rel_type, start, end, props)| {
                decode_properties(&props).map(|properties| Relationship {
                    id: RelationshipId::from(id),
                    rel_type,
                    start: EntityId::from(start),
                    end: EntityId::from(end),
                    properties,
                })
            })
            .transpose()?;
        let neighbor = self
            .neighbor
            .map(|(id, labels, props)| decode_entity(id, &labels, &props))
            .transpose()?;
        Ok(GraphRecord {
            primary,
            relationship,
            neighbor,
        })
    }
}

fn decode_properties(json: &str) -> Result<Properties> {
    serde_json::from_str(json).map_err(|e| Error::gateway("decode_properties", e))
}

fn decode_entity(id: i64, labels: &str, properties: &str) -> Result<Entity> {
    let labels: Vec<String> =
        serde_json::from_str(labels).map_err(|e| Error::gateway("decode_labels", e))?;
    Ok(Entity {
        id: EntityId::from(id),
        labels,
        properties: decode_properties(properties)?,
    })
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::gateway("encode_json", e))
}

/// Mirrors the string `name` property into the indexed column.
fn name_column(properties: &Properties) -> Option<&str> {
    properties.get(NAME_PROPERTY).and_then(PropertyValue::as_str)
}

/// `SQLite`-based graph store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and `busy_timeout`
/// handle concurrent access gracefully.
///
/// # Schema
///
/// - `nodes`: labels and properties as JSON, plus the mirrored `name`
/// - `relationships`: directed typed edges, cascading on node deletion
pub struct SqliteGraphStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteGraphStore {
    /// Opens (or creates) a `SQLite` graph store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_graph_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory `SQLite` graph store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_graph_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        // Enable WAL mode for better concurrent read performance
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let _ = conn.pragma_update(None, "busy_timeout", "5000");
        let _ = conn.pragma_update(None, "foreign_keys", "ON");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                labels TEXT NOT NULL,
                properties TEXT NOT NULL,
                name TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);
            CREATE TABLE IF NOT EXISTS relationships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rel_type TEXT NOT NULL,
                start_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
                end_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
                properties TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_relationships_start ON relationships(start_id);
            CREATE INDEX IF NOT EXISTS idx_relationships_end ON relationships(end_id);",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_graph_tables".to_string(),
            cause: e.to_string(),
        })?;

        Ok(())
    }

    /// Runs an expansion query and decodes its rows.
    fn query_records(
        &self,
        operation: &str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<GraphRecord>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| Error::gateway(operation, e))?;
        let rows = stmt
            .query_map(params, RawRecord::from_row)
            .map_err(|e| Error::gateway(operation, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::gateway(operation, e))?;
        drop(stmt);
        drop(conn);

        rows.into_iter().map(RawRecord::decode).collect()
    }

    fn first_node_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM nodes WHERE name = ?1 ORDER BY id LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()
    }
}

impl GraphGateway for SqliteGraphStore {
    #[instrument(skip(self), fields(operation = "find_exact"))]
    fn find_exact(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let sql = format!("{EXPAND_SELECT} WHERE n.name = ?1 ORDER BY n.id, r.id");
        self.query_records("find_exact", &sql, params![name])
    }

    #[instrument(skip(self), fields(operation = "find_contains"))]
    fn find_contains(&self, substring: &str, limit: usize) -> Result<Vec<GraphRecord>> {
        // instr() keeps the match case-sensitive, unlike LIKE.
        let sql = format!(
            "{EXPAND_SELECT} WHERE instr(n.name, ?1) > 0 ORDER BY n.id, r.id LIMIT ?2"
        );
        self.query_records("find_contains", &sql, params![substring, sql_limit(limit)])
    }

    #[instrument(skip(self), fields(operation = "list_all_names"))]
    fn list_all_names(&self, limit: usize) -> Result<Vec<String>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare_cached("SELECT name FROM nodes WHERE name IS NOT NULL ORDER BY id LIMIT ?1")
            .map_err(|e| Error::gateway("list_all_names", e))?;
        let names = stmt
            .query_map(params![sql_limit(limit)], |row| row.get(0))
            .map_err(|e| Error::gateway("list_all_names", e))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| Error::gateway("list_all_names", e));
        names
    }

    #[instrument(skip(self), fields(operation = "find_with_neighbors"))]
    fn find_with_neighbors(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let sql = format!("{EXPAND_SELECT} WHERE n.name = ?1 ORDER BY n.id, r.id");
        self.query_records("find_with_neighbors", &sql, params![name])
    }
}

impl GraphStore for SqliteGraphStore {
    fn sample(&self, limit: usize) -> Result<Vec<GraphRecord>> {
        let sql = format!("{OUTGOING_SELECT} ORDER BY n.id, r.id LIMIT ?1");
        self.query_records("sample", &sql, params![sql_limit(limit)])
    }

    fn outgoing(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let sql = format!("{OUTGOING_SELECT} WHERE n.name = ?1 ORDER BY n.id, r.id");
        self.query_records("outgoing", &sql, params![name])
    }

    fn incoming(&self, name: &str) -> Result<Vec<GraphRecord>> {
        // Parent first so the record reads `parent -[r]-> name`.
        let sql = "
            SELECT p.id, p.labels, p.properties,
                   r.id, r.rel_type, r.start_id, r.end_id, r.properties,
                   c.id, c.labels, c.properties
            FROM nodes c
            JOIN relationships r ON r.end_id = c.id
            JOIN nodes p ON p.id = r.start_id
            WHERE c.name = ?1
            ORDER BY c.id, r.id";
        self.query_records("incoming", sql, params![name])
    }

    #[instrument(skip(self, properties))]
    fn create_node(&self, label: &str, properties: Properties) -> Result<Entity> {
        let labels = vec![label.to_string()];
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO nodes (labels, properties, name) VALUES (?1, ?2, ?3)",
            params![encode(&labels)?, encode(&properties)?, name_column(&properties)],
        )
        .map_err(|e| Error::gateway("create_node", e))?;

        Ok(Entity {
            id: EntityId::from(conn.last_insert_rowid()),
            labels,
            properties,
        })
    }

    #[instrument(skip(self, properties))]
    fn update_node(&self, name: &str, properties: Properties) -> Result<Option<Entity>> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::gateway("update_node", e))?;

        let existing = {
            let mut stmt = tx
                .prepare("SELECT id, labels, properties FROM nodes WHERE name = ?1 ORDER BY id")
                .map_err(|e| Error::gateway("update_node", e))?;
            stmt.query_map(params![name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| Error::gateway("update_node", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::gateway("update_node", e))?
        };

        let mut first = None;
        for (id, labels, props) in existing {
            let mut entity = decode_entity(id, &labels, &props)?;
            entity
                .properties
                .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            tx.execute(
                "UPDATE nodes SET properties = ?1, name = ?2 WHERE id = ?3",
                params![
                    encode(&entity.properties)?,
                    name_column(&entity.properties),
                    id
                ],
            )
            .map_err(|e| Error::gateway("update_node", e))?;
            first.get_or_insert(entity);
        }

        tx.commit().map_err(|e| Error::gateway("update_node", e))?;
        Ok(first)
    }

    #[instrument(skip(self))]
    fn delete_node(&self, name: &str) -> Result<DeleteSummary> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::gateway("delete_node", e))?;

        let relationships_deleted = tx
            .execute(
                "DELETE FROM relationships
                 WHERE start_id IN (SELECT id FROM nodes WHERE name = ?1)
                    OR end_id IN (SELECT id FROM nodes WHERE name = ?1)",
                params![name],
            )
            .map_err(|e| Error::gateway("delete_node", e))?;
        let nodes_deleted = tx
            .execute("DELETE FROM nodes WHERE name = ?1", params![name])
            .map_err(|e| Error::gateway("delete_node", e))?;

        tx.commit().map_err(|e| Error::gateway("delete_node", e))?;
        Ok(DeleteSummary {
            nodes_deleted,
            relationships_deleted,
        })
    }

    #[instrument(skip(self, properties))]
    fn merge_relationship(
        &self,
        start: &str,
        end: &str,
        rel_type: &str,
        properties: Properties,
    ) -> Result<Option<MergeOutcome>> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::gateway("merge_relationship", e))?;

        let start_id =
            Self::first_node_id(&tx, start).map_err(|e| Error::gateway("merge_relationship", e))?;
        let end_id =
            Self::first_node_id(&tx, end).map_err(|e| Error::gateway("merge_relationship", e))?;
        let (Some(start_id), Some(end_id)) = (start_id, end_id) else {
            return Ok(None);
        };

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, properties FROM relationships
                 WHERE start_id = ?1 AND end_id = ?2 AND rel_type = ?3
                 ORDER BY id LIMIT 1",
                params![start_id, end_id, rel_type],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| Error::gateway("merge_relationship", e))?;

        let (id, merged, was_updated) = if let Some((id, props)) = existing {
            let mut merged = decode_properties(&props)?;
            merged.extend(properties);
            tx.execute(
                "UPDATE relationships SET properties = ?1 WHERE id = ?2",
                params![encode(&merged)?, id],
            )
            .map_err(|e| Error::gateway("merge_relationship", e))?;
            (id, merged, true)
        } else {
            tx.execute(
                "INSERT INTO relationships (rel_type, start_id, end_id, properties)
                 VALUES (?1, ?2, ?3, ?4)",
                params![rel_type, start_id, end_id, encode(&properties)?],
            )
            .map_err(|e| Error::gateway("merge_relationship", e))?;
            (tx.last_insert_rowid(), properties, false)
        };

        tx.commit()
            .map_err(|e| Error::gateway("merge_relationship", e))?;

        Ok(Some(MergeOutcome {
            relationship: Relationship {
                id: RelationshipId::from(id),
                rel_type: rel_type.to_string(),
                start: EntityId::from(start_id),
                end: EntityId::from(end_id),
                properties: merged,
            },
            was_updated,
        }))
    }

    #[instrument(skip(self))]
    fn delete_relationships(&self, start: &str, end: &str, rel_type: &str) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "DELETE FROM relationships
             WHERE rel_type = ?3
               AND start_id IN (SELECT id FROM nodes WHERE name = ?1)
               AND end_id IN (SELECT id FROM nodes WHERE name = ?2)",
            params![start, end, rel_type],
        )
        .map_err(|e| Error::gateway("delete_relationships", e))
    }

    fn stats(&self) -> Result<GraphStats> {
        let conn = acquire_lock(&self.conn);
        let count = |sql: &str| -> Result<usize> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| usize::try_from(n).unwrap_or(0))
                .map_err(|e| Error::gateway("stats", e))
        };
        Ok(GraphStats {
            node_count: count("SELECT COUNT(*) FROM nodes")?,
            relationship_count: count("SELECT COUNT(*) FROM relationships")?,
        })
    }
}
