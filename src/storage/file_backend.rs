//! Directory-of-JSON-files storage backend.
//!
//! Each key is stored as `<encoded-key>.json` inside the cache directory.
//!
//! # Features
//! - Atomic writes using temp file + rename (prevents torn entries)
//! - Blocking file I/O runs on the tokio blocking pool
//! - Key names are percent-encoded so any key maps to a portable file name

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::storage::backend::{StorageBackend, expiry_from, is_expired};

const BACKEND_NAME: &str = "file";

/// Distinguishes temp files of concurrent writes to the same key.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk envelope around a stored value.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Storage backend writing one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a backend rooted at `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .map_err(|e| CacheError::storage(BACKEND_NAME, "open", format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }

    async fn blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| CacheError::storage(BACKEND_NAME, operation, e))?
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9._-]`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Inverse of [`encode_key`]; `None` for names it could not have produced.
fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn list_keys(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let encoded_prefix = encode_key(prefix);
    let entries =
        std::fs::read_dir(dir).map_err(|e| CacheError::storage(BACKEND_NAME, "list", e))?;

    let mut keys = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CacheError::storage(BACKEND_NAME, "list", e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        // Temp files start with '.', which encode_key never emits first.
        if name.starts_with('.') || !name.starts_with(&encoded_prefix) {
            continue;
        }
        if let Some(key) = name.strip_suffix(".json").and_then(decode_key) {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn read_entry(path: &Path) -> Result<Option<FileEntry>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::storage(BACKEND_NAME, "load", e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CacheError::CorruptEntry {
            key: path.display().to_string(),
            message: e.to_string(),
        })
}

fn remove_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::storage(BACKEND_NAME, "remove", e)),
    }
}

/// Write bytes atomically using temp file + rename.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Create temp file in same directory (required for atomic rename)
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("entry"),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    std::fs::rename(&temp_path, path)?;

    Ok(())
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn save(&self, key: &str, data: Value, expires: Option<Duration>) -> Result<()> {
        let path = self.entry_path(key);
        let entry = FileEntry {
            data,
            expires_at: expiry_from(expires),
        };
        self.blocking("save", move || {
            let content = serde_json::to_vec(&entry)?;
            write_atomic(&path, &content).map_err(|e| CacheError::storage(BACKEND_NAME, "save", e))
        })
        .await
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.entry_path(key);
        self.blocking("load", move || {
            let Some(entry) = read_entry(&path)? else {
                return Ok(None);
            };
            if is_expired(entry.expires_at) {
                remove_file(&path)?;
                return Ok(None);
            }
            Ok(Some(entry.data))
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        self.blocking("remove", move || remove_file(&path)).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.dir.clone();
        let prefix = prefix.to_string();
        self.blocking("list", move || list_keys(&dir, &prefix)).await
    }
}
