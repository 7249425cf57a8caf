//! Shared output helpers: JSON envelopes and error rendering.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Version of the JSON output shape.
pub const SCHEMA_VERSION: &str = "wcache.v1";

/// Top-level JSON document for every command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'a, T: Serialize> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: &'a str,
    pub data: T,
}

/// Serialize `data` inside an [`Envelope`].
///
/// # Errors
/// Returns an error if `data` cannot be serialized.
pub fn to_json<T: Serialize>(command: &str, data: T) -> Result<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        command,
        data,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Format a millisecond timestamp for humans.
#[must_use]
pub fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms).map_or_else(
        || format!("{ms} ms"),
        |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Serialize)]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
    suggestions: Vec<SuggestionJson>,
}

#[derive(Serialize)]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
}

/// Render an error for stderr, as JSON or as a short human message.
#[must_use]
pub fn render_error(error: &CacheError, json: bool) -> String {
    if json {
        render_error_json(error)
    } else {
        render_error_human(error)
    }
}

fn render_error_json(error: &CacheError) -> String {
    let payload = ErrorJson {
        error_code: error.error_code(),
        category: error.category().to_string(),
        message: error.to_string(),
        is_retryable: error.is_retryable(),
        suggestions: error
            .fix_suggestions()
            .into_iter()
            .map(|s| SuggestionJson {
                commands: s.commands,
                context: s.context,
                prevention: s.prevention,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| render_error_human(error))
}

fn render_error_human(error: &CacheError) -> String {
    let mut lines = vec![format!(
        "{} {}",
        format!("Error [{}]:", error.error_code()).red().bold(),
        error
    )];

    if let Some(suggestion) = error.fix_suggestions().first() {
        // First runnable command; `#` lines are prose.
        if let Some(cmd) = suggestion.commands.iter().find(|c| !c.starts_with('#')) {
            lines.push(format!("{} {cmd}", "Fix:".yellow()));
        }
        lines.push(suggestion.context.dimmed().to_string());
    }

    lines.join("\n")
}
