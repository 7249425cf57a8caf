//! Error types for wallet-cache.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Storage**: the backend failed to read, write, or delete an entry
//! - **Schema**: a stored entry carries a stale or missing version tag
//! - **Payload**: a caller handed the cache a payload missing required fields
//! - **Configuration**: config file parsing, validation, or invalid values
//! - **Internal**: I/O, JSON, or unclassified errors
//!
//! Each error has a stable error code (e.g., `WCACHE-S001`) for programmatic handling.
//!
//! ## Propagation
//!
//! Only the storage backends and the configuration layer return these errors.
//! The cache components built on [`crate::storage::VersionedStore`] never
//! return them to callers; they are logged with their error code and counted
//! as suppressed, and the operation degrades to a cache miss or a no-op.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Backend failures (quota, permissions, locked database, unreadable file).
    Storage,
    /// Stale or missing schema version tags.
    Schema,
    /// Caller-supplied payloads missing required fields.
    Payload,
    /// Configuration issues (parse errors, invalid values, missing files).
    Configuration,
    /// Internal errors (I/O, JSON, unexpected state).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Storage => "Storage error",
            Self::Schema => "Schema error",
            Self::Payload => "Payload error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Storage => "S",
            Self::Schema => "V",
            Self::Payload => "P",
            Self::Configuration => "C",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `wcache` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Storage backend could not be opened or used
    StorageError = 2,
    /// Invalid configuration or arguments
    ConfigError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for wallet-cache operations.
///
/// Each variant has:
/// - A stable error code (e.g., `WCACHE-S001`)
/// - A category for classification
/// - A retryable flag
#[derive(Error, Debug)]
pub enum CacheError {
    // ==========================================================================
    // Storage errors (Category: Storage)
    // ==========================================================================
    /// The storage backend failed an operation.
    #[error("storage backend {backend} unavailable during {operation}: {message}")]
    StorageUnavailable {
        backend: String,
        operation: String,
        message: String,
    },

    /// A stored entry exists but cannot be decoded.
    #[error("corrupted entry for key '{key}': {message}")]
    CorruptEntry { key: String, message: String },

    // ==========================================================================
    // Schema errors (Category: Schema)
    // ==========================================================================
    /// Stored version tag does not match the expected schema version.
    #[error("stale entry for key '{key}': found version {found:?}, expected {expected}")]
    SchemaStale {
        key: String,
        found: Option<String>,
        expected: String,
    },

    // ==========================================================================
    // Payload errors (Category: Payload)
    // ==========================================================================
    /// An update was called without a required field.
    #[error("malformed payload for {operation}: missing {field}")]
    MalformedPayload { operation: String, field: String },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Configuration file not found at expected path.
    #[error("config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CacheError {
    /// Build a [`CacheError::StorageUnavailable`] from any displayable backend error.
    pub fn storage(backend: &str, operation: &str, err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            backend: backend.to_string(),
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::StorageUnavailable { .. } | Self::CorruptEntry { .. } => ExitCode::StorageError,

            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::MalformedPayload { .. } => ExitCode::ConfigError,

            Self::SchemaStale { .. } | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::StorageUnavailable { .. } | Self::CorruptEntry { .. } => ErrorCategory::Storage,
            Self::SchemaStale { .. } => ErrorCategory::Schema,
            Self::MalformedPayload { .. } => ErrorCategory::Payload,
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `WCACHE-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::StorageUnavailable { .. } => "WCACHE-S001",
            Self::CorruptEntry { .. } => "WCACHE-S002",

            Self::SchemaStale { .. } => "WCACHE-V001",

            Self::MalformedPayload { .. } => "WCACHE-P001",

            Self::ConfigNotFound { .. } => "WCACHE-C001",
            Self::ConfigParse { .. } => "WCACHE-C002",
            Self::ConfigInvalid { .. } => "WCACHE-C003",
            Self::Config(_) => "WCACHE-C004",

            Self::Io(_) => "WCACHE-X001",
            Self::Json(_) => "WCACHE-X002",
            Self::Other(_) => "WCACHE-X099",
        }
    }

    /// Returns whether retrying the same operation could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Io(_))
    }

    /// Returns the storage key this error concerns, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::CorruptEntry { key, .. } | Self::SchemaStale { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::StorageUnavailable {
                backend, message, ..
            } => suggestions::storage_unavailable_suggestions(backend, message),
            Self::CorruptEntry { key, .. } => suggestions::corrupt_entry_suggestions(key),
            Self::SchemaStale { key, .. } => suggestions::schema_stale_suggestions(key),
            Self::MalformedPayload { operation, field } => {
                suggestions::malformed_payload_suggestions(operation, field)
            }
            Self::ConfigNotFound { path } => suggestions::config_not_found_suggestions(path),
            Self::ConfigParse { path, message } => {
                suggestions::config_parse_suggestions(path, message)
            }
            Self::ConfigInvalid {
                key,
                value,
                message,
            } => suggestions::config_invalid_suggestions(key, value, message),
            Self::Config(msg) => vec![FixSuggestion::new(
                vec!["wcache --help".to_string()],
                format!("Configuration error: {msg}"),
            )],
            Self::Io(err) => vec![FixSuggestion::new(
                vec!["# Check file permissions and disk space".to_string()],
                format!("I/O error: {err}. Check file permissions and available disk space."),
            )],
            Self::Json(err) => vec![FixSuggestion::new(
                vec!["# Validate the input file with a JSON linter".to_string()],
                format!("JSON error: {err}. The data may be corrupted or in an unexpected format."),
            )],
            Self::Other(err) => vec![FixSuggestion::new(
                Vec::new(),
                format!("Unexpected error: {err}. Please report this issue."),
            )],
        }
    }
}

/// Result type alias for wallet-cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// =============================================================================
// Tests
// =============================================================================
