//! Request signature hashing.
//!
//! A signature identifies "the same request" for the ledger. It is built
//! from the request's identifying fields and hashed with SHA-256 so ledger
//! keys have a fixed size regardless of payload.

use crate::models::Properties;
use sha2::{Digest, Sha256};

/// Separator between signature components; cannot appear in JSON text
/// unescaped, so components never run into each other.
const SEPARATOR: char = '\u{1f}';

/// SHA-256 hasher for request signatures.
///
/// # Normalization
///
/// Before hashing, each component is:
/// - Trimmed of leading/trailing whitespace
/// - Collapsed so runs of whitespace become a single space
///
/// Case is preserved: graph names are case-sensitive.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::deduplication::SignatureHasher;
///
/// let hash = SignatureHasher::hash(&["张三", "认识", "李四"]);
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, SignatureHasher::hash(&[" 张三 ", "认识", "李四"]));
/// ```
pub struct SignatureHasher;

impl SignatureHasher {
    /// Hashes the normalized components into lowercase hex.
    #[must_use]
    pub fn hash(components: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for (i, component) in components.iter().enumerate() {
            if i > 0 {
                let mut buf = [0_u8; 4];
                hasher.update(SEPARATOR.encode_utf8(&mut buf).as_bytes());
            }
            hasher.update(Self::normalize(component).as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Trims and collapses whitespace.
    #[must_use]
    pub fn normalize(component: &str) -> String {
        component.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Identity of a request for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Signature of a relationship-creation request.
    ///
    /// Property maps are ordered, so equal maps serialize identically.
    #[must_use]
    pub fn relationship(start: &str, rel_type: &str, end: &str, properties: &Properties) -> Self {
        let props = serde_json::to_string(properties).unwrap_or_default();
        Self(SignatureHasher::hash(&[
            "relationship",
            start,
            rel_type,
            end,
            &props,
        ]))
    }

    /// Signature from arbitrary components.
    #[must_use]
    pub fn from_parts(parts: &[&str]) -> Self {
        Self(SignatureHasher::hash(parts))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
