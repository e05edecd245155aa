//! Business logic services.
//!
//! Services orchestrate the graph store and provide high-level operations:
//! question resolution, validated CRUD, and the voice round trip.

pub mod deduplication;
pub mod fuzzy;
mod graph;
pub mod import;
mod search;
pub mod voice;

pub use graph::{DEFAULT_SAMPLE_SIZE, GraphService, RelationshipRequest};
pub use search::{DEFAULT_FUZZY_THRESHOLD, SearchService};
pub use voice::VoiceService;
