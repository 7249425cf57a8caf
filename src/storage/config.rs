//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/wcache/config.toml`
//! - macOS: `~/Library/Application Support/io.wallet-cache.wcache/config.toml`
//! - Windows: `%APPDATA%/wallet-cache/wcache/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `WCACHE_CONFIG`: Override config file path
//! - `WCACHE_BACKEND`: Storage backend (memory, file, sqlite)
//! - `WCACHE_STORE_PATH`: Database file or entry directory
//! - `WCACHE_NO_COLOR` or `NO_COLOR`: Disable colors (1, true, yes)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::Cli;
use crate::error::{CacheError, Result};
use crate::storage::backend::BackendKind;
use crate::storage::settings::{DEFAULT_LANGUAGE, DEFAULT_NATIVE_CURRENCY, SettingsDefaults};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "WCACHE_CONFIG";
/// Environment variable for the storage backend.
pub const ENV_BACKEND: &str = "WCACHE_BACKEND";
/// Environment variable for the store location.
pub const ENV_STORE_PATH: &str = "WCACHE_STORE_PATH";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "WCACHE_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Backend to open.
    pub backend: BackendKind,
    /// Database file or entry directory.
    pub store_path: PathBuf,
    /// Values returned for settings never saved.
    pub defaults: SettingsDefaults,
    /// Whether to disable colored output.
    pub no_color: bool,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub backend: ConfigSource,
    pub store_path: ConfigSource,
    pub defaults: ConfigSource,
    pub no_color: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An explicitly requested config file is missing
    /// - The config file exists but is invalid
    /// - Any resolved value is invalid (e.g., unknown backend)
    pub fn resolve(cli: &Cli) -> Result<Self> {
        Self::resolve_with(cli, &AppPaths::new(), |var| std::env::var(var).ok())
    }

    /// Resolve against explicit paths and an environment lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ResolvedConfig::resolve`].
    pub fn resolve_with<F>(cli: &Cli, paths: &AppPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::load_config(cli, paths, &env)?;
        config.validate()?;

        let mut sources = ConfigSources::default();

        let backend = Self::resolve_backend(cli, &config, &env, &mut sources.backend)?;
        let store_path =
            Self::resolve_store_path(cli, &config, paths, backend, &env, &mut sources.store_path);
        let defaults = Self::resolve_defaults(&config, &mut sources.defaults);
        let no_color = Self::resolve_no_color(cli, &config, &env, &mut sources.no_color);

        tracing::debug!(
            backend = %backend,
            backend_source = %sources.backend,
            store_path = %store_path.display(),
            store_path_source = %sources.store_path,
            "Resolved configuration"
        );

        Ok(Self {
            backend,
            store_path,
            defaults,
            no_color,
            sources,
        })
    }

    /// Load config file, respecting `--config` and `WCACHE_CONFIG`.
    ///
    /// An explicitly named file must exist; the default location may not.
    fn load_config<F>(cli: &Cli, paths: &AppPaths, env: &F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = cli
            .config
            .clone()
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from));

        match explicit {
            Some(path) if !path.exists() => Err(CacheError::ConfigNotFound {
                path: path.display().to_string(),
            }),
            Some(path) => Config::load_from(&path),
            None => Config::load_from(&paths.config_file()),
        }
    }

    fn resolve_backend<F>(
        cli: &Cli,
        config: &Config,
        env: &F,
        source: &mut ConfigSource,
    ) -> Result<BackendKind>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. CLI flag
        if let Some(backend) = &cli.backend {
            *source = ConfigSource::Cli;
            return backend.parse();
        }

        // 2. Environment variable
        if let Some(backend) = env(ENV_BACKEND) {
            *source = ConfigSource::Env;
            return backend.parse();
        }

        // 3. Config file
        if let Some(backend) = &config.storage.backend {
            *source = ConfigSource::ConfigFile;
            return backend.parse();
        }

        // 4. Default
        *source = ConfigSource::Default;
        Ok(BackendKind::default())
    }

    fn resolve_store_path<F>(
        cli: &Cli,
        config: &Config,
        paths: &AppPaths,
        backend: BackendKind,
        env: &F,
        source: &mut ConfigSource,
    ) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &cli.store_path {
            *source = ConfigSource::Cli;
            return path.clone();
        }

        if let Some(path) = env(ENV_STORE_PATH).filter(|p| !p.trim().is_empty()) {
            *source = ConfigSource::Env;
            return PathBuf::from(path);
        }

        if let Some(path) = &config.storage.path {
            *source = ConfigSource::ConfigFile;
            return path.clone();
        }

        *source = ConfigSource::Default;
        paths.default_store_path(backend)
    }

    fn resolve_defaults(config: &Config, source: &mut ConfigSource) -> SettingsDefaults {
        let defaults = &config.defaults;
        *source = if defaults.native_currency.is_some() || defaults.language.is_some() {
            ConfigSource::ConfigFile
        } else {
            ConfigSource::Default
        };

        SettingsDefaults {
            native_currency: defaults
                .native_currency
                .clone()
                .unwrap_or_else(|| DEFAULT_NATIVE_CURRENCY.to_string()),
            language: defaults
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        }
    }

    fn resolve_no_color<F>(cli: &Cli, config: &Config, env: &F, source: &mut ConfigSource) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }

        if is_truthy(env(ENV_NO_COLOR).as_deref()) || env(ENV_NO_COLOR_STD).is_some() {
            *source = ConfigSource::Env;
            return true;
        }

        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }
}

/// Whether an environment value reads as "on".
#[must_use]
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage settings.
    pub storage: StorageConfig,
    /// Values returned for settings never saved.
    pub defaults: DefaultsConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// Storage backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend name (memory, file, sqlite).
    pub backend: Option<String>,
    /// Database file or entry directory.
    pub path: Option<PathBuf>,
}

/// Overrides for the built-in setting defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Native currency code (e.g. "USD").
    pub native_currency: Option<String>,
    /// Language code (e.g. "en").
    pub language: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CacheError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - The backend name is known
    /// - Default currency and language are not blank
    ///
    /// # Errors
    /// Returns [`CacheError::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if let Some(backend) = &self.storage.backend {
            backend.parse::<BackendKind>()?;
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err(invalid("storage.path", "", "path must not be empty"));
            }
        }

        for (key, value) in [
            ("defaults.native_currency", &self.defaults.native_currency),
            ("defaults.language", &self.defaults.language),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(invalid(key, value, "value must not be blank"));
                }
            }
        }

        Ok(())
    }
}

fn invalid(key: &str, value: &str, message: &str) -> CacheError {
    CacheError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn make_test_cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["wcache"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["settings", "show"]);
        Cli::parse_from(argv)
    }

    fn test_paths(dir: &TempDir) -> AppPaths {
        AppPaths {
            config: dir.path().join("config"),
            data: dir.path().join("data"),
        }
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn write_config(paths: &AppPaths, content: &str) {
        std::fs::create_dir_all(&paths.config).unwrap();
        std::fs::write(paths.config_file(), content).unwrap();
    }

    #[test]
    fn config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI flag");
        assert_eq!(format!("{}", ConfigSource::Env), "environment variable");
        assert_eq!(format!("{}", ConfigSource::ConfigFile), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }

    #[test]
    fn resolved_config_default_values() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);

        let resolved = ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env_from(&[]))
            .unwrap();

        assert_eq!(resolved.backend, BackendKind::Sqlite);
        assert_eq!(resolved.store_path, paths.default_store_path(BackendKind::Sqlite));
        assert_eq!(resolved.defaults, SettingsDefaults::default());
        assert!(!resolved.no_color);
        assert_eq!(resolved.sources.backend, ConfigSource::Default);
        assert_eq!(resolved.sources.store_path, ConfigSource::Default);
    }

    #[test]
    fn cli_overrides_env_and_file() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        write_config(&paths, "[storage]\nbackend = \"file\"\n");

        let cli = make_test_cli(&["--backend", "memory", "--store-path", "/tmp/x"]);
        let env = env_from(&[(ENV_BACKEND, "sqlite"), (ENV_STORE_PATH, "/tmp/y")]);
        let resolved = ResolvedConfig::resolve_with(&cli, &paths, env).unwrap();

        assert_eq!(resolved.backend, BackendKind::Memory);
        assert_eq!(resolved.store_path, PathBuf::from("/tmp/x"));
        assert_eq!(resolved.sources.backend, ConfigSource::Cli);
        assert_eq!(resolved.sources.store_path, ConfigSource::Cli);
    }

    #[test]
    fn env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        write_config(&paths, "[storage]\nbackend = \"file\"\npath = \"/from/file\"\n");

        let env = env_from(&[(ENV_BACKEND, "memory")]);
        let resolved = ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env).unwrap();

        assert_eq!(resolved.backend, BackendKind::Memory);
        assert_eq!(resolved.sources.backend, ConfigSource::Env);
        assert_eq!(resolved.store_path, PathBuf::from("/from/file"));
        assert_eq!(resolved.sources.store_path, ConfigSource::ConfigFile);
    }

    #[test]
    fn file_backend_defaults_to_entry_directory() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        write_config(&paths, "[storage]\nbackend = \"file\"\n");

        let resolved =
            ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env_from(&[])).unwrap();

        assert_eq!(resolved.backend, BackendKind::File);
        assert_eq!(resolved.sources.backend, ConfigSource::ConfigFile);
        assert_eq!(resolved.store_path, paths.data.join("entries"));
    }

    #[test]
    fn defaults_come_from_config_file() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        write_config(
            &paths,
            "[defaults]\nnative_currency = \"EUR\"\nlanguage = \"de\"\n",
        );

        let resolved =
            ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env_from(&[])).unwrap();

        assert_eq!(resolved.defaults.native_currency, "EUR");
        assert_eq!(resolved.defaults.language, "de");
        assert_eq!(resolved.sources.defaults, ConfigSource::ConfigFile);
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);

        let env = env_from(&[(ENV_CONFIG, "/nonexistent/wcache.toml")]);
        let err = ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env).unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-C001");
    }

    #[test]
    fn config_env_override_is_used() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);
        let custom = dir.path().join("custom.toml");
        std::fs::write(&custom, "[storage]\nbackend = \"memory\"\n").unwrap();

        let env = env_from(&[(ENV_CONFIG, custom.to_str().unwrap())]);
        let resolved = ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env).unwrap();
        assert_eq!(resolved.backend, BackendKind::Memory);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);

        let env = env_from(&[(ENV_BACKEND, "redis")]);
        let err = ResolvedConfig::resolve_with(&make_test_cli(&[]), &paths, env).unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-C003");
    }

    #[test]
    fn no_color_sources() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(&dir);

        let resolved = ResolvedConfig::resolve_with(
            &make_test_cli(&[]),
            &paths,
            env_from(&[(ENV_NO_COLOR_STD, "")]),
        )
        .unwrap();
        assert!(resolved.no_color);
        assert_eq!(resolved.sources.no_color, ConfigSource::Env);

        let resolved = ResolvedConfig::resolve_with(
            &make_test_cli(&["--no-color"]),
            &paths,
            env_from(&[]),
        )
        .unwrap();
        assert_eq!(resolved.sources.no_color, ConfigSource::Cli);
    }

    #[test]
    fn is_truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "on"] {
            assert!(is_truthy(Some(value)), "{value} should be truthy");
        }
        for value in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(Some(value)), "{value} should be falsy");
        }
        assert!(!is_truthy(None));
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert!(config.storage.backend.is_none());
        assert!(config.output.color);
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-C002");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nbackend = \"file\"\nshard_count = 4\n\n[extra]\nx = 1").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.storage.backend.as_deref(), Some("file"));
    }

    #[test]
    fn validate_rejects_blank_defaults() {
        let mut config = Config::default();
        config.defaults.native_currency = Some("  ".to_string());

        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-C003");
        assert!(err.to_string().contains("defaults.native_currency"));
    }

    #[test]
    fn validate_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
