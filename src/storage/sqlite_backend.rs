//! `SQLite`-backed storage.
//!
//! All keys live in one `cache_entries` table. Statements run on the tokio
//! blocking pool behind a mutex-guarded connection.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::storage::backend::{StorageBackend, expiry_from, is_expired};
use crate::storage::sqlite_schema::{format_timestamp, purge_expired_entries, run_migrations};

const BACKEND_NAME: &str = "sqlite";

/// Storage backend persisting entries in a `SQLite` database.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Create or open a cache database at the given path.
    ///
    /// Applies pending migrations and purges entries whose backend expiry
    /// has passed.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created, the database
    /// cannot be opened, or schema migrations fail.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CacheError::storage(BACKEND_NAME, "open", format!("{}: {e}", path.display())))?;

        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    /// Returns an error if the in-memory database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CacheError::storage(BACKEND_NAME, "open", e))?;

        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| CacheError::storage(BACKEND_NAME, "configure", e))?;
        run_migrations(&mut conn)?;

        let purged = purge_expired_entries(&conn)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired cache entries");
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Count stored entries (expired ones included until purged).
    ///
    /// # Errors
    /// Returns an error if the COUNT query fails.
    pub async fn count_entries(&self) -> Result<i64> {
        self.with_conn("count", |conn| {
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
                .map_err(|e| CacheError::storage(BACKEND_NAME, "count", e))
        })
        .await
    }

    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| CacheError::storage(BACKEND_NAME, operation, e))?;
            f(&guard)
        })
        .await
        .map_err(|e| CacheError::storage(BACKEND_NAME, operation, e))?
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn save(&self, key: &str, data: Value, expires: Option<Duration>) -> Result<()> {
        let key = key.to_string();
        let data = serde_json::to_string(&data)?;
        let expires_at = expiry_from(expires).map(format_timestamp);
        let updated_at = format_timestamp(Utc::now());

        self.with_conn("save", move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, data, expires_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(key) DO UPDATE SET \
                    data = excluded.data, \
                    expires_at = excluded.expires_at, \
                    updated_at = excluded.updated_at",
                params![key, data, expires_at, updated_at],
            )
            .map_err(|e| CacheError::storage(BACKEND_NAME, "save", e))?;
            Ok(())
        })
        .await
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.with_conn("load", move |conn| {
            let row: Option<(String, Option<String>)> = conn
                .query_row(
                    "SELECT data, expires_at FROM cache_entries WHERE key = ?1",
                    [&key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(|e| CacheError::storage(BACKEND_NAME, "load", e))?;

            let Some((data, expires_at)) = row else {
                return Ok(None);
            };

            let expires_at = expires_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            if is_expired(expires_at) {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", [&key])
                    .map_err(|e| CacheError::storage(BACKEND_NAME, "load", e))?;
                return Ok(None);
            }

            serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| CacheError::CorruptEntry {
                    key,
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn("remove", move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", [&key])
                .map_err(|e| CacheError::storage(BACKEND_NAME, "remove", e))?;
            Ok(())
        })
        .await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.with_conn("list", move |conn| {
            let mut stmt = conn
                .prepare("SELECT key FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1")
                .map_err(|e| CacheError::storage(BACKEND_NAME, "list", e))?;
            let keys = stmt
                .query_map([&prefix], |row| row.get::<_, String>(0))
                .map_err(|e| CacheError::storage(BACKEND_NAME, "list", e))?
                .collect::<std::result::Result<Vec<String>, _>>()
                .map_err(|e| CacheError::storage(BACKEND_NAME, "list", e))?;
            Ok(keys)
        })
        .await
    }
}
