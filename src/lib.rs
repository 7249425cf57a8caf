//! wallet-cache - client-side persistence for a crypto wallet manager.
//!
//! Caches account balances, unique tokens and transactions per address and
//! network, wallet-connect pairing sessions, and global settings on top of a
//! pluggable key-value backend. Every stored entry carries a schema version
//! tag; entries with an outdated tag are dropped on read.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wallet_cache::storage::{CacheOrchestrator, SqliteBackend};
//!
//! let backend = Arc::new(SqliteBackend::open(path)?);
//! let cache = CacheOrchestrator::with_backend(backend);
//! cache.apply_account_fetch(&payload, "mainnet").await;
//! let state = cache.hydrate("0xabc", "mainnet").await;
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{CacheError, ExitCode, Result};
pub use storage::{AccountCache, CacheOrchestrator, GlobalSettingsCache, SessionStore, VersionedStore};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
