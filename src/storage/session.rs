//! Wallet-connect pairing sessions.
//!
//! All sessions live in one map under the `walletconnect` key. Reads filter
//! out expired records; `save` writes back only the valid ones, so expired
//! sessions disappear on the next save.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::core::models::{SessionMap, SessionRecord};
use crate::error::CacheError;
use crate::storage::keys::SESSIONS_KEY;
use crate::storage::versioned::{STORAGE_VERSION_FIELD, VersionedStore};

/// Current time in Unix epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Session id -> pairing record, with expiration-based eviction.
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: VersionedStore,
    version: String,
    write_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(store: VersionedStore, version: impl Into<String>) -> Self {
        Self {
            store,
            version: version.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sessions that have not expired. Nothing is written.
    pub async fn list_valid(&self) -> SessionMap {
        self.list_valid_at(now_ms()).await
    }

    /// Sessions still valid at `now_ms`.
    pub async fn list_valid_at(&self, now_ms: i64) -> SessionMap {
        let mut sessions = self.load_all().await;
        sessions.retain(|_, record| record.is_valid_at(now_ms));
        sessions
    }

    /// A single valid session.
    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.list_valid().await.remove(session_id)
    }

    /// Store a session, dropping every expired one in the same write.
    pub async fn save(&self, session_id: &str, uri_string: &str, expiration_ms: i64) {
        if session_id.is_empty() || session_id == STORAGE_VERSION_FIELD {
            let err = CacheError::MalformedPayload {
                operation: "save session".to_string(),
                field: "usable session id".to_string(),
            };
            tracing::debug!(session_id, error_code = err.error_code(), error = %err, "Skipping session save");
            return;
        }

        let _guard = self.write_lock.lock().await;
        let now = now_ms();
        let mut sessions = self.list_valid_at(now).await;
        sessions.insert(
            session_id.to_string(),
            SessionRecord {
                uri_string: uri_string.to_string(),
                expiration: expiration_ms,
            },
        );
        self.store.save(SESSIONS_KEY, &sessions, &self.version).await;
        tracing::debug!(session_id, sessions = sessions.len(), "Saved session");
    }

    /// Delete a session, returning what was stored for it (expired or not).
    pub async fn remove(&self, session_id: &str) -> Option<SessionRecord> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.load_all().await;
        let removed = sessions.remove(session_id)?;
        self.store.save(SESSIONS_KEY, &sessions, &self.version).await;
        tracing::debug!(session_id, "Removed session");
        Some(removed)
    }

    /// Delete every session.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.store.remove(SESSIONS_KEY).await;
    }

    async fn load_all(&self) -> SessionMap {
        self.store
            .load(SESSIONS_KEY, &self.version)
            .await
            .unwrap_or_default()
    }
}
