//! Storage layer abstraction.
//!
//! The graph is the only persistent state. Stores implement [`GraphStore`];
//! the fuzzy resolver depends only on its [`GraphGateway`] supertrait.

// Allow cast precision loss for permit gauges.
#![allow(clippy::cast_precision_loss)]
// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod bulkhead;
pub mod graph;
pub mod traits;

pub use bulkhead::{BulkheadGraphStore, GraphBulkheadConfig};
pub use traits::{GraphGateway, GraphStore};

use crate::Result;
use crate::config::{GraphBackendKind, GraphSettings};
use graph::{InMemoryGraphStore, SqliteGraphStore};
use std::sync::Arc;

/// Opens the configured graph store behind a bulkhead.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened.
pub fn open_graph_store(
    settings: &GraphSettings,
    bulkhead: &GraphBulkheadConfig,
) -> Result<Arc<dyn GraphStore>> {
    let store: Arc<dyn GraphStore> = match settings.backend {
        GraphBackendKind::Memory => Arc::new(BulkheadGraphStore::new(
            InMemoryGraphStore::new(),
            bulkhead.clone(),
            "memory",
        )),
        GraphBackendKind::Sqlite => {
            let path = settings.resolved_path();
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::Error::operation("create_graph_dir", e))?;
            }
            tracing::info!(path = %path.display(), "Opening SQLite graph store");
            Arc::new(BulkheadGraphStore::new(
                SqliteGraphStore::new(path)?,
                bulkhead.clone(),
                "sqlite",
            ))
        },
    };
    Ok(store)
}
