//! HTTP API.
//!
//! An axum router over the services. Store calls are blocking, so every
//! handler moves its service call onto the blocking pool.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | Liveness plus graph counts |
//! | `/api/data/...` | Browse, CRUD, semantic and fuzzy search |
//! | `/api/voice/...` | Scripted chat and the voice round trip |

mod error;
mod handlers;
mod server;
mod voice;

pub use error::ApiError;
pub use server::{AppState, build_router, serve};
