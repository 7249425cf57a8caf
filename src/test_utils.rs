//! Test utilities for wallet-cache.
//!
//! Provides data factories, a backend that fails every call, and temporary
//! stores for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wallet_cache::test_utils::*;
//!
//! let dir = TestDir::new();
//! for (name, backend) in all_backends(&dir) {
//!     let cache = CacheOrchestrator::with_backend(backend);
//!     cache.apply_account_fetch(&make_payload("0xabc", &["ETH"]), "mainnet").await;
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::models::{AccountPayload, Asset, DisplayAmount, Transaction, UniqueToken};
use crate::error::{CacheError, Result};
use crate::storage::backend::{MemoryBackend, StorageBackend};
use crate::storage::file_backend::FileBackend;
use crate::storage::sqlite_backend::SqliteBackend;

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create an asset with a formatted balance.
#[must_use]
pub fn make_asset(symbol: &str, amount: &str) -> Asset {
    Asset {
        symbol: symbol.to_string(),
        name: Some(symbol.to_string()),
        decimals: Some(18),
        balance: Some(DisplayAmount::new(amount, format!("{amount} {symbol}"))),
        ..Asset::default()
    }
}

/// Create a fetched account payload holding one unit of each symbol.
///
/// `type` is "software" and the total is "$10.00"; no transactions.
#[must_use]
pub fn make_payload(address: &str, symbols: &[&str]) -> AccountPayload {
    AccountPayload {
        address: Some(address.to_string()),
        wallet_type: Some("software".to_string()),
        assets: Some(symbols.iter().map(|s| make_asset(s, "1")).collect()),
        total: Some(DisplayAmount::new("10", "$10.00")),
        transactions: None,
    }
}

/// Create a transaction with the given hash and confirmation state.
#[must_use]
pub fn make_transaction(hash: &str, pending: bool) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        from: Some("0x1111111111111111111111111111111111111111".to_string()),
        to: Some("0x2222222222222222222222222222222222222222".to_string()),
        value: Some(DisplayAmount::new("0.5", "0.5 ETH")),
        timestamp: (!pending).then_some(1_546_300_800),
        pending,
        ..Transaction::default()
    }
}

/// Create a unique token with the given id.
#[must_use]
pub fn make_unique_token(id: &str) -> UniqueToken {
    UniqueToken {
        id: id.to_string(),
        name: Some(format!("Token #{id}")),
        contract_address: Some("0x3333333333333333333333333333333333333333".to_string()),
        image_url: Some(format!("https://example.invalid/{id}.png")),
        ..UniqueToken::default()
    }
}

// =============================================================================
// Backends
// =============================================================================

/// Backend that fails every operation, counting the attempts.
#[derive(Debug, Default)]
pub struct FailingBackend {
    calls: AtomicU64,
}

impl FailingBackend {
    /// Number of operations attempted.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn fail(&self, operation: &str) -> CacheError {
        self.calls.fetch_add(1, Ordering::Relaxed);
        CacheError::storage("failing", operation, "quota exceeded")
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn save(&self, _key: &str, _data: Value, _expires: Option<Duration>) -> Result<()> {
        Err(self.fail("save"))
    }

    async fn load(&self, _key: &str) -> Result<Option<Value>> {
        Err(self.fail("load"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(self.fail("remove"))
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(self.fail("list"))
    }
}

/// One instance of every real backend, rooted under `dir`.
///
/// # Panics
///
/// Panics if the file or `SQLite` backend cannot be opened.
#[must_use]
pub fn all_backends(dir: &TestDir) -> Vec<(&'static str, Arc<dyn StorageBackend>)> {
    let memory: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    let file: Arc<dyn StorageBackend> =
        Arc::new(FileBackend::open(dir.file_path("entries")).expect("open file backend"));
    let sqlite: Arc<dyn StorageBackend> = Arc::new(
        SqliteBackend::open(&dir.file_path("cache.sqlite")).expect("open sqlite backend"),
    );
    vec![("memory", memory), ("file", file), ("sqlite", sqlite)]
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// An isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Write a file, creating parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.file_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write test file");
    }

    /// Get the full path to a file in the temporary directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_backend_counts_calls() {
        let backend = FailingBackend::default();
        assert!(backend.save("k", Value::Null, None).await.is_err());
        assert!(backend.load("k").await.is_err());
        assert!(backend.remove("k").await.is_err());
        assert!(backend.keys_with_prefix("k").await.is_err());
        assert_eq!(backend.calls(), 4);
    }

    #[test]
    fn factories_produce_expected_shapes() {
        let payload = make_payload("0xabc", &["ETH", "DAI"]);
        assert_eq!(payload.assets.as_ref().unwrap().len(), 2);
        assert!(make_transaction("h", true).timestamp.is_none());
        assert!(make_transaction("h", false).timestamp.is_some());
    }

    #[test]
    fn all_backends_open() {
        let dir = TestDir::new();
        let names: Vec<_> = all_backends(&dir).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["memory", "file", "sqlite"]);
    }
}
