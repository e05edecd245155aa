//! Bulkhead pattern implementation for graph store calls.
//!
//! Limits the number of concurrent store calls with a semaphore and bounds
//! each read with a deadline. A read that overruns its deadline is reported
//! as [`Error::Gateway`] and its result is discarded, so the fuzzy resolver
//! treats it like any other stage failure.
//!
//! Writes take a permit but run inline without a deadline, so a write is
//! never reported as failed after it commits.
//!
//! # Usage
//!
//! ```rust
//! use heritage_kg::storage::graph::InMemoryGraphStore;
//! use heritage_kg::storage::{BulkheadGraphStore, GraphBulkheadConfig, GraphGateway};
//!
//! let store = BulkheadGraphStore::new(
//!     InMemoryGraphStore::new(),
//!     GraphBulkheadConfig::default().with_call_timeout_ms(500),
//!     "memory",
//! );
//!
//! assert!(store.find_exact("张三")?.is_empty());
//! # Ok::<(), heritage_kg::Error>(())
//! ```

use super::traits::{GraphGateway, GraphStore};
use crate::models::{DeleteSummary, Entity, GraphRecord, GraphStats, MergeOutcome, Properties};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Configuration for the graph store bulkhead (`[bulkhead]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphBulkheadConfig {
    /// Maximum concurrent store calls allowed.
    ///
    /// Default: 10.
    pub max_concurrent: usize,

    /// Timeout for acquiring a permit in milliseconds (0 = no timeout).
    ///
    /// Default: 5000ms (5 seconds).
    pub acquire_timeout_ms: u64,

    /// Deadline for a single store call in milliseconds (0 = no deadline).
    ///
    /// Default: 3000ms.
    pub call_timeout_ms: u64,

    /// Whether to fail fast when bulkhead is full (vs. waiting).
    ///
    /// Default: false (wait for permit).
    pub fail_fast: bool,
}

impl Default for GraphBulkheadConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBulkheadConfig {
    /// Creates a new graph bulkhead configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_concurrent: 10,
            acquire_timeout_ms: 5000,
            call_timeout_ms: 3000,
            fail_fast: false,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `HERITAGE_BULKHEAD_MAX_CONCURRENT` | Max concurrent calls | 10 |
    /// | `HERITAGE_BULKHEAD_ACQUIRE_TIMEOUT_MS` | Permit timeout | 5000 |
    /// | `HERITAGE_BULKHEAD_CALL_TIMEOUT_MS` | Per-call deadline | 3000 |
    /// | `HERITAGE_BULKHEAD_FAIL_FAST` | Fail when full | false |
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("HERITAGE_BULKHEAD_MAX_CONCURRENT")
            && let Ok(parsed) = v.parse::<usize>()
        {
            self.max_concurrent = parsed.max(1);
        }
        if let Ok(v) = std::env::var("HERITAGE_BULKHEAD_ACQUIRE_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.acquire_timeout_ms = parsed;
        }
        if let Ok(v) = std::env::var("HERITAGE_BULKHEAD_CALL_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.call_timeout_ms = parsed;
        }
        if let Ok(v) = std::env::var("HERITAGE_BULKHEAD_FAIL_FAST") {
            self.fail_fast = v.to_lowercase() == "true" || v == "1";
        }
        self
    }

    /// Sets the maximum concurrent calls.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Sets the acquire timeout in milliseconds.
    #[must_use]
    pub const fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Sets the per-call deadline in milliseconds.
    #[must_use]
    pub const fn with_call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    /// Sets whether to fail fast when the bulkhead is full.
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Graph store wrapper with concurrency limiting and per-call deadlines.
pub struct BulkheadGraphStore<S: GraphStore + 'static> {
    inner: Arc<S>,
    config: GraphBulkheadConfig,
    semaphore: Arc<Semaphore>,
    backend_name: &'static str,
}

impl<S: GraphStore + 'static> BulkheadGraphStore<S> {
    /// Creates a new bulkhead-wrapped graph store.
    #[must_use]
    pub fn new(inner: S, config: GraphBulkheadConfig, backend_name: &'static str) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner: Arc::new(inner),
            config,
            semaphore,
            backend_name,
        }
    }

    /// Returns the current number of available permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Acquires a permit, respecting the configured timeout and fail-fast settings.
    fn acquire_permit(&self, operation: &'static str) -> Result<OwnedSemaphorePermit> {
        let available = self.semaphore.available_permits();

        metrics::gauge!(
            "graph_bulkhead_available_permits",
            "backend" => self.backend_name
        )
        .set(available as f64);

        if self.config.fail_fast {
            return Arc::clone(&self.semaphore).try_acquire_owned().map_err(|_| {
                self.reject("full");
                Error::gateway(
                    operation,
                    format!(
                        "graph bulkhead full: {} concurrent calls (max: {})",
                        self.config.max_concurrent.saturating_sub(available),
                        self.config.max_concurrent
                    ),
                )
            });
        }

        let timeout_ms = if self.config.acquire_timeout_ms == 0 {
            60_000 // 60 second safety cap
        } else {
            self.config.acquire_timeout_ms
        };
        let timeout = Duration::from_millis(timeout_ms);
        let start = std::time::Instant::now();

        loop {
            if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
                metrics::counter!(
                    "graph_bulkhead_permits_acquired_total",
                    "backend" => self.backend_name
                )
                .increment(1);
                return Ok(permit);
            }

            if start.elapsed() >= timeout {
                self.reject("timeout");
                return Err(Error::gateway(
                    operation,
                    format!("graph bulkhead acquire timed out after {timeout_ms}ms"),
                ));
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn reject(&self, reason: &'static str) {
        metrics::counter!(
            "graph_bulkhead_rejections_total",
            "backend" => self.backend_name,
            "reason" => reason
        )
        .increment(1);
    }

    /// Executes a write under a permit, inline and without a deadline.
    fn execute_write<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&S) -> Result<T>,
    ) -> Result<T> {
        let _permit = self.acquire_permit(operation)?;
        call(self.inner.as_ref())
    }

    /// Executes a store read under a permit and the per-call deadline.
    ///
    /// With a deadline, the call runs on its own thread holding the permit.
    /// On timeout the result is discarded; the thread finishes in the
    /// background and only then releases its permit.
    fn execute<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let permit = self.acquire_permit(operation)?;

        if self.config.call_timeout_ms == 0 {
            let result = call(self.inner.as_ref());
            drop(permit);
            return result;
        }

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let parent_span = tracing::Span::current();
        std::thread::Builder::new()
            .name(format!("graph-{operation}"))
            .spawn(move || {
                let _parent = parent_span.enter();
                let result = call(inner.as_ref());
                drop(permit);
                // Receiver is gone after a timeout; nothing to do.
                let _ = tx.send(result);
            })
            .map_err(|e| Error::gateway(operation, e))?;

        let deadline = Duration::from_millis(self.config.call_timeout_ms);
        match rx.recv_timeout(deadline) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                metrics::counter!(
                    "graph_bulkhead_call_timeouts_total",
                    "backend" => self.backend_name,
                    "operation" => operation
                )
                .increment(1);
                tracing::warn!(
                    backend = self.backend_name,
                    operation,
                    deadline_ms = self.config.call_timeout_ms,
                    "Graph call overran its deadline, discarding result"
                );
                Err(Error::gateway(
                    operation,
                    format!("deadline of {}ms exceeded", self.config.call_timeout_ms),
                ))
            },
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::gateway(operation, "store call thread panicked"))
            },
        }
    }
}

impl<S: GraphStore + 'static> GraphGateway for BulkheadGraphStore<S> {
    fn find_exact(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let name = name.to_string();
        self.execute("find_exact", move |s| s.find_exact(&name))
    }

    fn find_contains(&self, substring: &str, limit: usize) -> Result<Vec<GraphRecord>> {
        let substring = substring.to_string();
        self.execute("find_contains", move |s| s.find_contains(&substring, limit))
    }

    fn list_all_names(&self, limit: usize) -> Result<Vec<String>> {
        self.execute("list_all_names", move |s| s.list_all_names(limit))
    }

    fn find_with_neighbors(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let name = name.to_string();
        self.execute("find_with_neighbors", move |s| s.find_with_neighbors(&name))
    }
}

impl<S: GraphStore + 'static> GraphStore for BulkheadGraphStore<S> {
    fn sample(&self, limit: usize) -> Result<Vec<GraphRecord>> {
        self.execute("sample", move |s| s.sample(limit))
    }

    fn outgoing(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let name = name.to_string();
        self.execute("outgoing", move |s| s.outgoing(&name))
    }

    fn incoming(&self, name: &str) -> Result<Vec<GraphRecord>> {
        let name = name.to_string();
        self.execute("incoming", move |s| s.incoming(&name))
    }

    fn create_node(&self, label: &str, properties: Properties) -> Result<Entity> {
        self.execute_write("create_node", |s| s.create_node(label, properties))
    }

    fn update_node(&self, name: &str, properties: Properties) -> Result<Option<Entity>> {
        self.execute_write("update_node", |s| s.update_node(name, properties))
    }

    fn delete_node(&self, name: &str) -> Result<DeleteSummary> {
        self.execute_write("delete_node", |s| s.delete_node(name))
    }

    fn merge_relationship(
        &self,
        start: &str,
        end: &str,
        rel_type: &str,
        properties: Properties,
    ) -> Result<Option<MergeOutcome>> {
        self.execute_write("merge_relationship", |s| {
            s.merge_relationship(start, end, rel_type, properties)
        })
    }

    fn delete_relationships(&self, start: &str, end: &str, rel_type: &str) -> Result<usize> {
        self.execute_write("delete_relationships", |s| {
            s.delete_relationships(start, end, rel_type)
        })
    }

    fn stats(&self) -> Result<GraphStats> {
        self.execute("stats", S::stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::graph::InMemoryGraphStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose reads sleep before answering.
    struct SlowStore {
        delay_ms: u64,
        calls: AtomicUsize,
        written: InMemoryGraphStore,
    }

    impl SlowStore {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                calls: AtomicUsize::new(0),
                written: InMemoryGraphStore::new(),
            }
        }
    }

    impl GraphGateway for SlowStore {
        fn find_exact(&self, _name: &str) -> Result<Vec<GraphRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(self.delay_ms));
            Ok(Vec::new())
        }

        fn find_contains(&self, _substring: &str, _limit: usize) -> Result<Vec<GraphRecord>> {
            Ok(Vec::new())
        }

        fn list_all_names(&self, _limit: usize) -> Result<Vec<String>> {
            Ok(vec!["张三".to_string()])
        }

        fn find_with_neighbors(&self, _name: &str) -> Result<Vec<GraphRecord>> {
            Ok(Vec::new())
        }
    }

    impl GraphStore for SlowStore {
        fn sample(&self, _limit: usize) -> Result<Vec<GraphRecord>> {
            Ok(Vec::new())
        }

        fn outgoing(&self, _name: &str) -> Result<Vec<GraphRecord>> {
            Ok(Vec::new())
        }

        fn incoming(&self, _name: &str) -> Result<Vec<GraphRecord>> {
            Ok(Vec::new())
        }

        fn create_node(&self, label: &str, properties: Properties) -> Result<Entity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(self.delay_ms));
            self.written.create_node(label, properties)
        }

        fn update_node(&self, _name: &str, _properties: Properties) -> Result<Option<Entity>> {
            Ok(None)
        }

        fn delete_node(&self, _name: &str) -> Result<DeleteSummary> {
            Ok(DeleteSummary::default())
        }

        fn merge_relationship(
            &self,
            _start: &str,
            _end: &str,
            _rel_type: &str,
            _properties: Properties,
        ) -> Result<Option<MergeOutcome>> {
            Ok(None)
        }

        fn delete_relationships(&self, _start: &str, _end: &str, _rel_type: &str) -> Result<usize> {
            Ok(0)
        }

        fn stats(&self) -> Result<GraphStats> {
            Ok(GraphStats::default())
        }
    }

    #[test]
    fn test_graph_bulkhead_config_default() {
        let config = GraphBulkheadConfig::default();
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.acquire_timeout_ms, 5000);
        assert_eq!(config.call_timeout_ms, 3000);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_graph_bulkhead_config_builder() {
        let config = GraphBulkheadConfig::new()
            .with_max_concurrent(2)
            .with_acquire_timeout_ms(10)
            .with_call_timeout_ms(0)
            .with_fail_fast(true);
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.acquire_timeout_ms, 10);
        assert_eq!(config.call_timeout_ms, 0);
        assert!(config.fail_fast);
    }

    #[test]
    fn test_bulkhead_passes_calls_through() {
        let store = BulkheadGraphStore::new(
            InMemoryGraphStore::new(),
            GraphBulkheadConfig::default(),
            "memory",
        );
        let mut props = Properties::new();
        props.insert("name".to_string(), "张三".into());
        store.create_node("Person", props).unwrap();

        assert_eq!(store.find_exact("张三").unwrap().len(), 1);
        assert_eq!(store.list_all_names(10).unwrap(), vec!["张三"]);
        assert_eq!(store.stats().unwrap().node_count, 1);
        assert_eq!(store.available_permits(), 10);
    }

    #[test]
    fn test_bulkhead_deadline_reports_gateway_error() {
        let store = BulkheadGraphStore::new(
            SlowStore::new(300),
            GraphBulkheadConfig::default().with_call_timeout_ms(20),
            "slow",
        );

        let err = store.find_exact("张三").unwrap_err();
        assert!(matches!(err, Error::Gateway { ref operation, .. } if operation == "find_exact"));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);

        // Fast calls still succeed under the same deadline.
        assert_eq!(store.list_all_names(10).unwrap().len(), 1);
    }

    #[test]
    fn test_bulkhead_writes_ignore_deadline() {
        let store = BulkheadGraphStore::new(
            SlowStore::new(100),
            GraphBulkheadConfig::default().with_call_timeout_ms(20),
            "slow",
        );
        let mut props = Properties::new();
        props.insert("name".to_string(), "张三".into());

        // A slow write reports what it did rather than timing out.
        let created = store.create_node("Person", props).unwrap();
        assert_eq!(created.name(), "张三");
        assert_eq!(store.inner().written.stats().unwrap().node_count, 1);
        assert_eq!(store.available_permits(), 10);
    }

    #[test]
    fn test_bulkhead_without_deadline_runs_inline() {
        let store = BulkheadGraphStore::new(
            SlowStore::new(5),
            GraphBulkheadConfig::default().with_call_timeout_ms(0),
            "slow",
        );
        assert!(store.find_exact("张三").unwrap().is_empty());
    }

    #[test]
    fn test_bulkhead_fail_fast_when_full() {
        let store = Arc::new(BulkheadGraphStore::new(
            SlowStore::new(200),
            GraphBulkheadConfig::default()
                .with_max_concurrent(1)
                .with_call_timeout_ms(0)
                .with_fail_fast(true),
            "slow",
        ));

        let busy = Arc::clone(&store);
        let handle = std::thread::spawn(move || busy.find_exact("张三"));
        std::thread::sleep(Duration::from_millis(50));

        let err = store.find_exact("李四").unwrap_err();
        assert!(err.to_string().contains("bulkhead full"));

        assert!(handle.join().unwrap().is_ok());
    }
}
