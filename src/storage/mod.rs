//! Storage backends, the versioned store, and the caches built on it.

pub mod account;
pub mod backend;
pub mod config;
pub mod file_backend;
pub mod keys;
pub mod orchestrator;
pub mod paths;
pub mod session;
pub mod settings;
pub mod sqlite_backend;
pub mod sqlite_schema;
pub mod versioned;

pub use account::AccountCache;
pub use backend::{BackendKind, MemoryBackend, StorageBackend, open_backend};
pub use config::{
    Config, ConfigSource, ConfigSources, ENV_BACKEND, ENV_CONFIG, ENV_NO_COLOR, ENV_NO_COLOR_STD,
    ENV_STORE_PATH, ResolvedConfig,
};
pub use file_backend::FileBackend;
pub use keys::{AccountKeys, AccountSection, SchemaVersions};
pub use orchestrator::{CacheOrchestrator, HydratedState};
pub use paths::AppPaths;
pub use session::SessionStore;
pub use settings::{GlobalSettingsCache, SettingsDefaults};
pub use sqlite_backend::SqliteBackend;
pub use versioned::{CacheMetrics, MetricsSnapshot, STORAGE_VERSION_FIELD, VersionedStore};
