//! Request deduplication.
//!
//! Clients that retry eagerly (the voice front end re-posts on slow replies)
//! can submit the same write several times in a burst. The ledger rejects a
//! repeat of the same signature inside a short window.
//!
//! ```text
//! request ─► RequestSignature (SHA-256) ─► RequestLedger
//!                                            │
//!                     seen < 5s ago ─────────┼─► Duplicate (429)
//!                     otherwise ─────────────┴─► Fresh, recorded
//! ```

mod hasher;
mod ledger;

pub use hasher::{RequestSignature, SignatureHasher};
pub use ledger::{LedgerConfig, LedgerDecision, RequestLedger};
