//! Storage backend contract and the in-memory implementation.
//!
//! The cache layer depends only on the operations of [`StorageBackend`]:
//! `save`, `load`, `remove`, and `keys_with_prefix`. Concrete backends live
//! in [`super::file_backend`] (one JSON file per key) and
//! [`super::sqlite_backend`] (a single `SQLite` table).
//!
//! Backends report failures as [`CacheError`]; it is the versioned store's
//! job to turn those into cache misses.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};
use crate::storage::file_backend::FileBackend;
use crate::storage::sqlite_backend::SqliteBackend;

/// Asynchronous key-value store the cache is built on.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Write `data` under `key`, replacing any previous value.
    ///
    /// `expires` sets a backend-level time to live; `None` keeps the entry
    /// until it is removed.
    async fn save(&self, key: &str, data: Value, expires: Option<Duration>) -> Result<()>;

    /// Read the value under `key`. Absent and backend-expired entries are `None`.
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Delete `key`. Deleting an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Every stored key starting with `prefix`, in no particular order.
    ///
    /// May include backend-expired entries that have not been read since
    /// they expired.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Compute the absolute expiry for a time to live.
pub(crate) fn expiry_from(expires: Option<Duration>) -> Option<DateTime<Utc>> {
    expires.and_then(|ttl| {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
    })
}

/// Whether an entry with the given expiry is no longer readable.
pub(crate) fn is_expired(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.is_some_and(|at| at <= Utc::now())
}

// =============================================================================
// Backend selection
// =============================================================================

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local map; nothing survives exit.
    Memory,
    /// One JSON file per key in a directory.
    File,
    /// Single `SQLite` database file.
    #[default]
    Sqlite,
}

impl BackendKind {
    /// Config/CLI name of the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "files" | "json" => Ok(Self::File),
            "sqlite" | "sqlite3" | "db" => Ok(Self::Sqlite),
            other => Err(CacheError::ConfigInvalid {
                key: "storage.backend".to_string(),
                value: other.to_string(),
                message: "unknown backend".to_string(),
            }),
        }
    }
}

/// Open the backend of the given kind rooted at `path`.
///
/// For [`BackendKind::File`] `path` is a directory; for
/// [`BackendKind::Sqlite`] it is the database file. The memory backend
/// ignores it.
///
/// # Errors
/// Returns an error if the directory or database cannot be created or opened.
pub fn open_backend(kind: BackendKind, path: PathBuf) -> Result<Arc<dyn StorageBackend>> {
    tracing::debug!(backend = %kind, path = %path.display(), "Opening storage backend");
    let backend: Arc<dyn StorageBackend> = match kind {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::File => Arc::new(FileBackend::open(path)?),
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(&path)?),
    };
    Ok(backend)
}

// =============================================================================
// In-memory backend
// =============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory backend, used in tests and for throwaway CLI sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the backend holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether `key` is physically present, ignoring expiry.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Raw stored value, including the version tag.
    pub async fn raw(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).map(|e| e.data.clone())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, key: &str, data: Value, expires: Option<Duration>) -> Result<()> {
        let entry = MemoryEntry {
            data,
            expires_at: expiry_from(expires),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !is_expired(entry.expires_at) => {
                    return Ok(Some(entry.data.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired. Re-check under the write lock; a writer may have replaced it.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| is_expired(e.expires_at)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_roundtrip() {
        let backend = MemoryBackend::new();
        backend
            .save("k", json!({ "a": 1 }), None)
            .await
            .unwrap();
        assert_eq!(backend.load("k").await.unwrap(), Some(json!({ "a": 1 })));

        backend.remove("k").await.unwrap();
        assert_eq!(backend.load("k").await.unwrap(), None);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn memory_lists_keys_by_prefix() {
        let backend = MemoryBackend::new();
        for key in ["acct:a:x", "acct:a:y", "acct:ab:x", "other"] {
            backend.save(key, json!({}), None).await.unwrap();
        }

        let mut keys = backend.keys_with_prefix("acct:a:").await.unwrap();
        keys.sort();
        assert_eq!(keys, ["acct:a:x", "acct:a:y"]);
        assert!(backend.keys_with_prefix("none").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_remove_absent_key_is_ok() {
        let backend = MemoryBackend::new();
        assert!(backend.remove("missing").await.is_ok());
    }

    #[tokio::test]
    async fn memory_expired_entry_is_dropped_on_read() {
        let backend = MemoryBackend::new();
        backend
            .save("k", json!({}), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(backend.load("k").await.unwrap(), None);
        assert!(!backend.contains_key("k").await);
    }

    #[test]
    fn backend_kind_parsing() {
        assert_eq!("sqlite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("FILE".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert_eq!(" memory ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        let err = "redis".parse::<BackendKind>().unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-C003");
    }

    #[test]
    fn open_memory_backend_ignores_path() {
        let backend = open_backend(BackendKind::Memory, PathBuf::from("/nonexistent")).unwrap();
        assert_eq!(backend.name(), "memory");
    }
}
