//! Import command handler.

#![allow(clippy::print_stdout)]

use anyhow::Context as _;
use heritage_kg::config::{GraphBackendKind, HeritageConfig};
use heritage_kg::services::GraphService;
use heritage_kg::services::import::{GraphDocument, import_document};
use std::path::Path;

/// Import command.
pub fn cmd_import(config: &HeritageConfig, file: &Path) -> anyhow::Result<()> {
    let document = GraphDocument::load(file)?;

    if config.graph.backend == GraphBackendKind::Memory {
        tracing::warn!("Importing into the memory backend; the graph is discarded on exit");
    }

    let store = super::open_store(config)?;
    let summary = import_document(&GraphService::new(store), document)
        .with_context(|| format!("import of {} stopped", file.display()))?;

    println!(
        "Imported {} nodes and {} relationships from {}",
        summary.nodes,
        summary.relationships,
        file.display()
    );
    Ok(())
}
