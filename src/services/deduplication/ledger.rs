//! Time-windowed request deduplication.
//!
//! Tracks when each request signature was last accepted in an LRU cache.
//! A signature accepted again inside the active window is a duplicate.

// Entry counts are far below f64's exact integer range.
#![allow(clippy::cast_precision_loss)]

use super::hasher::RequestSignature;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Ledger timing and sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Repeats within this many milliseconds are duplicates.
    pub active_window_ms: u64,
    /// Pruning starts once the ledger holds more entries than this.
    pub prune_threshold: usize,
    /// Pruning evicts entries older than this many milliseconds.
    pub prune_horizon_ms: u64,
    /// Hard bound on entries; the least recently used is evicted first.
    pub capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            active_window_ms: 5_000,
            prune_threshold: 1_000,
            prune_horizon_ms: 60_000,
            capacity: 10_000,
        }
    }
}

/// Outcome of [`RequestLedger::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerDecision {
    /// First sighting inside the window; the request was recorded.
    Fresh,
    /// Seen `age` ago, inside the active window. Not re-recorded.
    Duplicate {
        /// Time since the signature was accepted.
        age: Duration,
    },
}

impl LedgerDecision {
    /// Returns true for [`LedgerDecision::Duplicate`].
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Request-dedup ledger.
///
/// # Lock Poisoning
///
/// Fails open: if the lock is poisoned, every request is treated as fresh.
/// Missing a duplicate only lets a merge run twice, which is idempotent.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::deduplication::{LedgerConfig, RequestLedger, RequestSignature};
///
/// let ledger = RequestLedger::new(LedgerConfig::default());
/// let sig = RequestSignature::from_parts(&["张三", "认识", "李四"]);
///
/// assert!(!ledger.check_and_record(&sig).is_duplicate());
/// assert!(ledger.check_and_record(&sig).is_duplicate());
/// ```
pub struct RequestLedger {
    entries: Mutex<LruCache<String, Instant>>,
    active_window: Duration,
    prune_threshold: usize,
    prune_horizon: Duration,
}

impl RequestLedger {
    /// Creates a ledger.
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            active_window: Duration::from_millis(config.active_window_ms),
            prune_threshold: config.prune_threshold,
            prune_horizon: Duration::from_millis(config.prune_horizon_ms),
        }
    }

    /// Checks `signature` against the ledger and records it if fresh.
    #[instrument(skip(self, signature))]
    pub fn check_and_record(&self, signature: &RequestSignature) -> LedgerDecision {
        self.check_and_record_at(signature, Instant::now())
    }

    /// Same as [`Self::check_and_record`], at an explicit instant.
    pub fn check_and_record_at(&self, signature: &RequestSignature, now: Instant) -> LedgerDecision {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!("Request ledger lock poisoned, treating request as fresh");
            metrics::counter!("request_ledger_lock_poisoned_total").increment(1);
            return LedgerDecision::Fresh;
        };

        if let Some(seen) = entries.get(signature.as_str()) {
            let age = now.saturating_duration_since(*seen);
            if age < self.active_window {
                metrics::counter!("request_ledger_duplicates_total").increment(1);
                tracing::debug!(age_ms = age.as_millis(), "Duplicate request rejected");
                return LedgerDecision::Duplicate { age };
            }
        }

        entries.put(signature.as_str().to_string(), now);

        if entries.len() > self.prune_threshold {
            let stale: Vec<String> = entries
                .iter()
                .filter(|(_, seen)| now.saturating_duration_since(**seen) > self.prune_horizon)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &stale {
                entries.pop(key);
            }
            if !stale.is_empty() {
                metrics::counter!("request_ledger_pruned_total").increment(stale.len() as u64);
                tracing::debug!(pruned = stale.len(), "Pruned stale ledger entries");
            }
        }

        metrics::gauge!("request_ledger_entries").set(entries.len() as f64);

        LedgerDecision::Fresh
    }

    /// Returns the number of tracked signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if no signature is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
