//! Application paths for config and cached data.

use directories::ProjectDirs;
use std::path::PathBuf;

use crate::storage::backend::BackendKind;

/// Application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
    /// Data directory holding the store.
    pub data: PathBuf,
}

impl AppPaths {
    /// Create paths for the wcache application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("io", "wallet-cache", "wcache") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
                data: proj_dirs.data_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            Self {
                config: home.join(".config/wcache"),
                data: home.join(".local/share/wcache"),
            }
        }
    }

    /// Path to the config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Default store location for a backend: a database file for `SQLite`,
    /// a directory for the file backend.
    #[must_use]
    pub fn default_store_path(&self, kind: BackendKind) -> PathBuf {
        match kind {
            BackendKind::Sqlite => self.data.join("wallet-cache.sqlite"),
            BackendKind::File | BackendKind::Memory => self.data.join("entries"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
    }
}
