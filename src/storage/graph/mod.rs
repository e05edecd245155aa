//! Graph store implementations.
//!
//! # Available Stores
//!
//! | Store | Use Case | Features |
//! |-------|----------|----------|
//! | [`SqliteGraphStore`] | Default; embedded | WAL, indexed names |
//! | [`InMemoryGraphStore`] | Testing | Fast, no persistence |
//!
//! # Example
//!
//! ```rust
//! use heritage_kg::models::Properties;
//! use heritage_kg::storage::graph::SqliteGraphStore;
//! use heritage_kg::storage::{GraphGateway, GraphStore};
//!
//! let store = SqliteGraphStore::in_memory()?;
//! let mut props = Properties::new();
//! props.insert("name".to_string(), "张三".into());
//! store.create_node("Person", props)?;
//!
//! let records = store.find_exact("张三")?;
//! assert_eq!(records.len(), 1);
//! # Ok::<(), heritage_kg::Error>(())
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryGraphStore;
pub use sqlite::SqliteGraphStore;
