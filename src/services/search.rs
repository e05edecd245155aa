//! Question-level search over the graph.
//!
//! Wraps the fuzzy resolver with entity extraction ("张三是谁？" → "张三") and
//! response assembly.

use crate::models::ResolvedResponse;
use crate::services::fuzzy::{FuzzyResolver, ResolverConfig, ResultAssembler};
use crate::storage::GraphGateway;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::instrument;

/// Strips a trailing question phrase and question mark.
static ENTITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(.*?)(?:是谁|是什么|的关系|有什么|有哪些|属性)?[?？]?$")
        .unwrap_or_else(|_| unreachable!())
});

/// Default score threshold for [`SearchService::fuzzy_search`].
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.5;

/// Resolves questions and free-text mentions against the graph.
#[derive(Clone)]
pub struct SearchService {
    gateway: Arc<dyn GraphGateway>,
    config: ResolverConfig,
}

impl SearchService {
    /// Creates a search service.
    #[must_use]
    pub fn new(gateway: Arc<dyn GraphGateway>, config: ResolverConfig) -> Self {
        Self { gateway, config }
    }

    /// Extracts the entity mention from a question.
    ///
    /// Falls back to the whole trimmed question when stripping the suffix
    /// leaves nothing (e.g. the question is just "是谁？").
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the question is blank.
    ///
    /// # Example
    ///
    /// ```rust
    /// use heritage_kg::services::SearchService;
    ///
    /// assert_eq!(SearchService::extract_entity("张三是谁？")?, "张三");
    /// assert_eq!(SearchService::extract_entity(" 鎏金铜佛像有什么 ")?, "鎏金铜佛像");
    /// # Ok::<(), heritage_kg::Error>(())
    /// ```
    pub fn extract_entity(question: &str) -> Result<String> {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }

        let entity = ENTITY_PATTERN
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str().trim());

        Ok(if entity.is_empty() { trimmed } else { entity }.to_string())
    }

    /// Answers a natural-language question with the resolved subgraph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the question is blank.
    #[instrument(skip(self))]
    pub fn semantic_search(&self, question: &str) -> Result<ResolvedResponse> {
        let entity = Self::extract_entity(question)?;
        tracing::debug!(entity = %entity, "Extracted entity");

        let results = self.resolver().resolve(&entity)?;
        Ok(ResultAssembler::assemble(&entity, &results))
    }

    /// Resolves `text` and reports matched entities scoring at least
    /// `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `text` is blank or `threshold` is
    /// not a finite number.
    #[instrument(skip(self))]
    pub fn fuzzy_search(&self, text: &str, threshold: f64) -> Result<ResolvedResponse> {
        if !threshold.is_finite() {
            return Err(Error::InvalidInput(format!("invalid threshold: {threshold}")));
        }
        let results = self.resolver().resolve(text)?;
        Ok(ResultAssembler::assemble_primary_only(text, &results, threshold))
    }

    fn resolver(&self) -> FuzzyResolver<'_, dyn GraphGateway> {
        FuzzyResolver::new(self.gateway.as_ref(), self.config.clone())
    }
}
