//! Resolve command handler.

#![allow(clippy::print_stdout)]

use heritage_kg::config::HeritageConfig;
use heritage_kg::services::SearchService;
use heritage_kg::storage::GraphGateway;
use std::sync::Arc;

/// Resolve command.
///
/// Answers `query` as a question, or as a bare mention filtered by score
/// when `threshold` is given, and prints the response as JSON.
pub fn cmd_resolve(
    config: &HeritageConfig,
    query: &str,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let gateway: Arc<dyn GraphGateway> = store;
    let search = SearchService::new(gateway, config.resolver.clone());

    let response = match threshold {
        Some(threshold) => search.fuzzy_search(query, threshold)?,
        None => search.semantic_search(query)?,
    };

    if response.is_empty() {
        tracing::info!(query = %query, "No entities matched");
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
