//! # heritage-kg
//!
//! Knowledge-graph REST service for a cultural-heritage voice assistant.
//!
//! The interesting part is the fuzzy entity-resolution layer: an imprecise
//! mention ("张三丰", "六金佛像") is resolved to graph entities through a cascade
//! of matching strategies, each tried only when the cheaper one before it
//! found nothing:
//!
//! 1. exact name match
//! 2. substring match
//! 3. edit-distance ranking over the name pool
//! 4. phonetic (pinyin) ranking over the name pool
//!
//! Around it sit a property-graph store (in-memory or `SQLite`), an axum HTTP
//! API, a request-dedup ledger, and voice glue (speech gateway client plus a
//! scripted responder).
//!
//! ## Example
//!
//! ```rust
//! use heritage_kg::services::fuzzy::{FuzzyResolver, ResolverConfig, ResultAssembler};
//! use heritage_kg::storage::graph::InMemoryGraphStore;
//!
//! let store = InMemoryGraphStore::new();
//! let resolver = FuzzyResolver::new(&store, ResolverConfig::default());
//! let results = resolver.resolve("张三").unwrap_or_default();
//! let response = ResultAssembler::assemble("张三", &results);
//! assert_eq!(response.search_info.total_matches, 0);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod http;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::HeritageConfig;
pub use models::{
    Entity, EntityId, GraphRecord, MatchCandidate, MatchType, PropertyValue, Relationship,
    RelationshipId, ResolvedResponse, SearchResult,
};
pub use services::fuzzy::{FuzzyResolver, ResolverConfig, ResultAssembler};
pub use services::{GraphService, SearchService};
pub use storage::{GraphGateway, GraphStore};

/// Error type for heritage-kg operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty query, malformed label, missing request fields |
/// | `NotFound` | A named node or relationship does not exist |
/// | `Duplicate` | The request ledger saw the same request inside its window |
/// | `Gateway` | A graph store call failed or overran its deadline |
/// | `Speech` | The ASR/TTS gateway failed or returned garbage |
/// | `FeatureNotEnabled` | A collaborator (e.g. speech) is not configured |
/// | `OperationFailed` | Config, I/O, runtime and other plumbing failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A search query is empty or whitespace only
    /// - A node label contains characters outside `[A-Za-z0-9_]`
    /// - Required request fields are missing
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A named graph element does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The same request was submitted again inside the dedup window.
    #[error("duplicate request: {0}")]
    Duplicate(String),

    /// A graph gateway call failed.
    ///
    /// The fuzzy resolver recovers from this per stage; other callers
    /// surface it.
    #[error("gateway operation '{operation}' failed: {cause}")]
    Gateway {
        /// The gateway operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A speech gateway call failed.
    #[error("speech operation '{operation}' failed: {cause}")]
    Speech {
        /// The speech operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled or collaborator not configured.
    #[error("feature not enabled: {0}")]
    FeatureNotEnabled(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Config files cannot be read or parsed
    /// - The HTTP listener cannot bind
    /// - Observability initialization fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Gateway`] from any displayable cause.
    pub fn gateway(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Gateway {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds a [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for heritage-kg operations.
pub type Result<T> = std::result::Result<T, Error>;
