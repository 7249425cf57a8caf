//! Fix suggestion database for wallet-cache errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Fix commands in order of preference, copy-paste ready.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

// =============================================================================
// Suggestion Generators
// =============================================================================

/// Suggestions when the storage backend cannot be used.
#[must_use]
pub fn storage_unavailable_suggestions(backend: &str, message: &str) -> Vec<FixSuggestion> {
    let mut commands = vec!["wcache --backend memory session list".to_string()];
    if backend == "sqlite" {
        commands.insert(0, "# Close other processes holding the cache database".to_string());
    }
    vec![
        FixSuggestion::new(
            commands,
            format!(
                "The {backend} storage backend failed: {message}. The cache is advisory, \
                 so wallet data will be fetched from the network instead."
            ),
        )
        .with_prevention("Make sure the store path is writable and the disk is not full."),
    ]
}

/// Suggestions for an entry that exists but cannot be decoded.
#[must_use]
pub fn corrupt_entry_suggestions(key: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["wcache account reset <ADDRESS>".to_string(), "wcache session clear".to_string()],
        format!(
            "The cached entry '{key}' could not be decoded. It will be treated as a \
             cache miss; resetting the affected data rewrites it on the next fetch."
        ),
    )]
}

/// Suggestions for an entry written by a different schema version.
#[must_use]
pub fn schema_stale_suggestions(key: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        Vec::new(),
        format!(
            "The cached entry '{key}' was written by a different schema version and \
             has been evicted. No action is needed; it is repopulated on the next fetch."
        ),
    )]
}

/// Suggestions for updates called without required fields.
#[must_use]
pub fn malformed_payload_suggestions(operation: &str, field: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["wcache account import <ADDRESS> --network mainnet --file payload.json".to_string()],
        format!("{operation} requires '{field}'. The update was skipped and nothing was written."),
    )]
}

/// Suggestions when an explicitly requested config file is missing.
#[must_use]
pub fn config_not_found_suggestions(path: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![format!("touch {path}")],
            format!("No configuration file was found at {path}."),
        )
        .with_prevention("Unset WCACHE_CONFIG to use the default config location."),
    ]
}

/// Suggestions for TOML parse errors.
#[must_use]
pub fn config_parse_suggestions(path: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("$EDITOR {path}")],
        format!("The configuration file {path} is not valid TOML: {message}"),
    )]
}

/// Suggestions for invalid config values.
#[must_use]
pub fn config_invalid_suggestions(key: &str, value: &str, message: &str) -> Vec<FixSuggestion> {
    let mut suggestion = FixSuggestion::new(
        Vec::new(),
        format!("'{value}' is not a valid value for {key}: {message}"),
    );
    if key == "storage.backend" {
        suggestion = suggestion.with_prevention("Valid backends: memory, file, sqlite.");
    }
    vec![suggestion]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_storage_suggestion_mentions_lock() {
        let suggestions = storage_unavailable_suggestions("sqlite", "database is locked");
        assert!(suggestions[0].commands[0].contains("Close other processes"));
        assert!(suggestions[0].context.contains("database is locked"));
        assert!(suggestions[0].prevention.is_some());
    }

    #[test]
    fn backend_key_gets_valid_values() {
        let suggestions = config_invalid_suggestions("storage.backend", "redis", "unknown");
        assert_eq!(
            suggestions[0].prevention.as_deref(),
            Some("Valid backends: memory, file, sqlite.")
        );
    }
}
