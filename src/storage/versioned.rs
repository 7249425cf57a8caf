//! Version-tagged entries over a storage backend.
//!
//! Every persisted object carries a `storageVersion` field next to its
//! payload fields. A read that finds a different version treats the entry as
//! absent and deletes it, so a schema change evicts old data instead of
//! migrating it.
//!
//! This layer never returns errors. Backend failures, undecodable entries
//! and stale versions are logged with their error code, counted in
//! [`CacheMetrics`], and degrade to a cache miss (reads) or a no-op (writes).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CacheError;
use crate::storage::backend::StorageBackend;

/// Field name of the version tag inside every stored object.
pub const STORAGE_VERSION_FIELD: &str = "storageVersion";

/// Counters for versioned store operations.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Number of load calls.
    pub reads: AtomicU64,
    /// Number of save calls that reached the backend.
    pub writes: AtomicU64,
    /// Loads that returned a payload.
    pub hits: AtomicU64,
    /// Loads that returned nothing (absent, stale, or failed).
    pub misses: AtomicU64,
    /// Entries deleted because their version tag did not match.
    pub stale_evictions: AtomicU64,
    /// Errors swallowed instead of being returned.
    pub suppressed_errors: AtomicU64,
    /// Total read time in microseconds.
    pub read_time_us: AtomicU64,
    /// Total write time in microseconds.
    pub write_time_us: AtomicU64,
}

impl CacheMetrics {
    /// Create new metrics tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_evictions: AtomicU64::new(0),
            suppressed_errors: AtomicU64::new(0),
            read_time_us: AtomicU64::new(0),
            write_time_us: AtomicU64::new(0),
        }
    }

    /// Record a read operation.
    pub fn record_read(&self, duration: Duration, hit: bool) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        self.read_time_us
            .fetch_add(duration_us(duration), Ordering::Relaxed);
    }

    /// Record a write operation.
    pub fn record_write(&self, duration: Duration) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.write_time_us
            .fetch_add(duration_us(duration), Ordering::Relaxed);
    }

    /// Record a version-mismatch eviction.
    pub fn record_stale(&self) {
        self.stale_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a swallowed error.
    pub fn record_suppressed(&self) {
        self.suppressed_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average read time in microseconds.
    #[must_use]
    pub fn avg_read_time_us(&self) -> u64 {
        let reads = self.reads.load(Ordering::Relaxed);
        if reads == 0 {
            return 0;
        }
        self.read_time_us.load(Ordering::Relaxed) / reads
    }

    /// Get average write time in microseconds.
    #[must_use]
    pub fn avg_write_time_us(&self) -> u64 {
        let writes = self.writes.load(Ordering::Relaxed);
        if writes == 0 {
            return 0;
        }
        self.write_time_us.load(Ordering::Relaxed) / writes
    }

    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_evictions: self.stale_evictions.load(Ordering::Relaxed),
            suppressed_errors: self.suppressed_errors.load(Ordering::Relaxed),
            avg_read_time_us: self.avg_read_time_us(),
            avg_write_time_us: self.avg_write_time_us(),
        }
    }
}

/// Plain-value copy of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub stale_evictions: u64,
    pub suppressed_errors: u64,
    pub avg_read_time_us: u64,
    pub avg_write_time_us: u64,
}

#[allow(clippy::cast_possible_truncation)] // cache calls never take 584k years
const fn duration_us(duration: Duration) -> u64 {
    duration.as_micros() as u64
}

/// Generic version-checked get/set/remove over a storage backend.
#[derive(Clone)]
pub struct VersionedStore {
    backend: Arc<dyn StorageBackend>,
    metrics: Arc<CacheMetrics>,
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl VersionedStore {
    /// Wrap a backend handle.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Operation counters shared by all clones of this store.
    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Persist `payload` under `key`, tagged with `version`.
    ///
    /// The payload must serialize to a JSON object; the tag is added as a
    /// sibling field. Best effort: failures are logged and counted, never
    /// returned.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, payload: &T, version: &str) {
        let start = Instant::now();

        let mut object = match serde_json::to_value(payload) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                self.suppress(
                    key,
                    "save",
                    &CacheError::MalformedPayload {
                        operation: format!("save {key}"),
                        field: "object payload".to_string(),
                    },
                );
                return;
            }
            Err(e) => {
                self.suppress(key, "save", &CacheError::Json(e));
                return;
            }
        };
        object.insert(
            STORAGE_VERSION_FIELD.to_string(),
            Value::String(version.to_string()),
        );

        match self.backend.save(key, Value::Object(object), None).await {
            Ok(()) => {
                self.metrics.record_write(start.elapsed());
                tracing::trace!(key, version, "Saved cache entry");
            }
            Err(e) => self.suppress(key, "save", &e),
        }
    }

    /// Load the payload under `key` if it was written with `version`.
    ///
    /// Returns `None` when the entry is absent, unreadable, or was written
    /// with another version; in the last case the entry is deleted.
    pub async fn load<T: DeserializeOwned>(&self, key: &str, version: &str) -> Option<T> {
        let start = Instant::now();
        let loaded = self.load_inner(key, version).await;
        self.metrics.record_read(start.elapsed(), loaded.is_some());
        loaded
    }

    async fn load_inner<T: DeserializeOwned>(&self, key: &str, version: &str) -> Option<T> {
        let raw = match self.backend.load(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                self.suppress(key, "load", &e);
                return None;
            }
        };

        let Value::Object(mut object) = raw else {
            self.suppress(
                key,
                "load",
                &CacheError::CorruptEntry {
                    key: key.to_string(),
                    message: "stored value is not an object".to_string(),
                },
            );
            return None;
        };

        let found = match object.remove(STORAGE_VERSION_FIELD) {
            Some(Value::String(found)) => Some(found),
            _ => None,
        };
        if found.as_deref() != Some(version) {
            let stale = CacheError::SchemaStale {
                key: key.to_string(),
                found,
                expected: version.to_string(),
            };
            tracing::debug!(
                key,
                error_code = stale.error_code(),
                error = %stale,
                "Evicting stale cache entry"
            );
            self.metrics.record_stale();
            self.remove(key).await;
            return None;
        }

        match serde_json::from_value(Value::Object(object)) {
            Ok(payload) => Some(payload),
            Err(e) => {
                self.suppress(
                    key,
                    "load",
                    &CacheError::CorruptEntry {
                        key: key.to_string(),
                        message: e.to_string(),
                    },
                );
                None
            }
        }
    }

    /// Keys starting with `prefix`, whatever their version tag.
    ///
    /// A failed listing is logged and reads as no keys.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.backend.keys_with_prefix(prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                self.suppress(prefix, "list", &e);
                Vec::new()
            }
        }
    }

    /// Delete `key` unconditionally. Failures are logged, never returned.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            self.suppress(key, "remove", &e);
        }
    }

    fn suppress(&self, key: &str, operation: &str, err: &CacheError) {
        self.metrics.record_suppressed();
        tracing::warn!(
            key,
            operation,
            backend = self.backend.name(),
            error_code = err.error_code(),
            error = %err,
            "Cache operation failed; continuing without cache"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;
    use crate::test_utils::FailingBackend;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use tracing_test::traced_test;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        value: String,
        count: i32,
    }

    fn sample() -> TestData {
        TestData {
            value: "hello".to_string(),
            count: 42,
        }
    }

    fn store_with_memory() -> (VersionedStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (VersionedStore::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_and_strips_tag() {
        let (store, backend) = store_with_memory();
        store.save("k", &sample(), "0.1.0").await;

        let raw = backend.raw("k").await.unwrap();
        assert_eq!(raw[STORAGE_VERSION_FIELD], json!("0.1.0"));

        let loaded: Option<TestData> = store.load("k", "0.1.0").await;
        assert_eq!(loaded, Some(sample()));
    }

    #[tokio::test]
    async fn version_mismatch_evicts_entry() {
        let (store, backend) = store_with_memory();
        store.save("k", &sample(), "0.1.0").await;

        let loaded: Option<TestData> = store.load("k", "0.2.0").await;
        assert!(loaded.is_none());
        assert!(!backend.contains_key("k").await);

        let again: Option<TestData> = store.load("k", "0.1.0").await;
        assert!(again.is_none());
        assert_eq!(store.metrics().snapshot().stale_evictions, 1);
    }

    #[tokio::test]
    async fn untagged_entry_is_treated_as_stale() {
        let (store, backend) = store_with_memory();
        backend
            .save("k", json!({ "value": "x", "count": 1 }), None)
            .await
            .unwrap();

        let loaded: Option<TestData> = store.load("k", "0.1.0").await;
        assert!(loaded.is_none());
        assert!(!backend.contains_key("k").await);
    }

    #[tokio::test]
    async fn absent_key_is_a_miss() {
        let (store, _) = store_with_memory();
        let loaded: Option<TestData> = store.load("missing", "0.1.0").await;
        assert!(loaded.is_none());

        let metrics = store.metrics().snapshot();
        assert_eq!(metrics.reads, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.suppressed_errors, 0);
    }

    #[tokio::test]
    async fn shape_mismatch_is_a_suppressed_miss() {
        let (store, _) = store_with_memory();
        store.save("k", &json!({ "other": true }), "1").await;

        let loaded: Option<TestData> = store.load("k", "1").await;
        assert!(loaded.is_none());
        assert_eq!(store.metrics().snapshot().suppressed_errors, 1);
    }

    #[tokio::test]
    async fn non_object_payload_is_not_written() {
        let (store, backend) = store_with_memory();
        store.save("k", &vec![1, 2, 3], "1").await;

        assert!(backend.is_empty().await);
        assert_eq!(store.metrics().snapshot().suppressed_errors, 1);
    }

    #[tokio::test]
    async fn failing_backend_never_errors() {
        let store = VersionedStore::new(Arc::new(FailingBackend::default()));

        store.save("k", &sample(), "1").await;
        let loaded: Option<TestData> = store.load("k", "1").await;
        store.remove("k").await;

        assert!(loaded.is_none());
        assert_eq!(store.metrics().snapshot().suppressed_errors, 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn suppressed_failure_is_logged_with_code() {
        let store = VersionedStore::new(Arc::new(FailingBackend::default()));
        store.save("balances", &sample(), "1").await;

        assert!(logs_contain("WCACHE-S001"));
        assert!(logs_contain("continuing without cache"));
    }

    #[tokio::test]
    #[traced_test]
    async fn stale_eviction_is_logged() {
        let (store, _) = store_with_memory();
        store.save("k", &sample(), "0.1.0").await;
        let _: Option<TestData> = store.load("k", "0.2.0").await;

        assert!(logs_contain("WCACHE-V001"));
        assert!(logs_contain("Evicting stale cache entry"));
    }

    #[tokio::test]
    async fn prefix_listing_ignores_versions() {
        let (store, _) = store_with_memory();
        store.save("acct:a:x", &sample(), "1").await;
        store.save("acct:a:y", &sample(), "2").await;
        store.save("acct:b:x", &sample(), "1").await;

        let mut keys = store.keys_with_prefix("acct:a:").await;
        keys.sort();
        assert_eq!(keys, ["acct:a:x", "acct:a:y"]);

        let failing = VersionedStore::new(Arc::new(FailingBackend::default()));
        assert!(failing.keys_with_prefix("acct:").await.is_empty());
        assert_eq!(failing.metrics().snapshot().suppressed_errors, 1);
    }

    #[tokio::test]
    async fn remove_deletes_entry() {
        let (store, backend) = store_with_memory();
        store.save("k", &sample(), "1").await;
        store.remove("k").await;
        assert!(!backend.contains_key("k").await);
    }

    #[test]
    fn metrics_averages() {
        let metrics = CacheMetrics::new();

        metrics.record_read(Duration::from_micros(100), true);
        metrics.record_read(Duration::from_micros(200), false);

        assert_eq!(metrics.reads.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.avg_read_time_us(), 150);

        metrics.record_write(Duration::from_micros(500));
        assert_eq!(metrics.writes.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.avg_write_time_us(), 500);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
    }
}
