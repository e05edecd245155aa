//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `serve.rs`: HTTP server startup
//! - `resolve.rs`: One-shot question resolution
//! - `import.rs`: Graph document import
//! - `chat.rs`: Scripted chat
//! - `config.rs`: Configuration display

mod chat;
mod config;
mod import;
mod resolve;
mod serve;

pub use chat::cmd_chat;
pub use config::cmd_config;
pub use import::cmd_import;
pub use resolve::cmd_resolve;
pub use serve::cmd_serve;

use anyhow::Context as _;
use heritage_kg::config::HeritageConfig;
use heritage_kg::services::GraphService;
use heritage_kg::services::import::{GraphDocument, seed_document};
use heritage_kg::storage::{self, GraphStore};
use std::sync::Arc;

/// Opens the configured store, seeding it if a seed file is set and the
/// store is empty.
pub fn open_store(config: &HeritageConfig) -> anyhow::Result<Arc<dyn GraphStore>> {
    let store = storage::open_graph_store(&config.graph, &config.bulkhead)
        .context("failed to open graph store")?;

    if let Some(seed) = &config.graph.seed_file {
        let document = GraphDocument::load(seed)
            .with_context(|| format!("failed to read seed file {}", seed.display()))?;
        let seeded = seed_document(&GraphService::new(Arc::clone(&store)), document)
            .with_context(|| format!("failed to import seed file {}", seed.display()))?;
        if let Some(summary) = seeded {
            tracing::info!(
                path = %seed.display(),
                nodes = summary.nodes,
                relationships = summary.relationships,
                "Seeded graph store"
            );
        }
    }

    Ok(store)
}
