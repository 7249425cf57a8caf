//! `wcache session` commands.

use std::fmt::Write as _;

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::SessionCommand;
use crate::cli::output::{format_ms, to_json};
use crate::core::models::{SessionMap, SessionRecord};
use crate::error::Result;
use crate::storage::CacheOrchestrator;
use crate::storage::session::now_ms;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput {
    count: usize,
    sessions: SessionMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeOutput<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionRecord>,
}

/// Run a session subcommand and return what to print.
///
/// # Errors
/// Returns an error only if JSON output cannot be serialized.
pub async fn execute(cmd: &SessionCommand, cache: &CacheOrchestrator, json: bool) -> Result<String> {
    let sessions = cache.sessions();
    match cmd {
        SessionCommand::List => {
            let valid = sessions.list_valid().await;
            if json {
                return to_json(
                    "session list",
                    ListOutput {
                        count: valid.len(),
                        sessions: valid,
                    },
                );
            }
            Ok(render_list(&valid))
        }
        SessionCommand::Add { id, uri, ttl_secs } => {
            let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
            let expiration = now_ms().saturating_add(ttl_ms);
            sessions.save(id, uri, expiration).await;
            let saved = sessions.get(id).await;
            if json {
                return to_json("session add", ChangeOutput { id, session: saved });
            }
            Ok(match saved {
                Some(record) => format!(
                    "{} session {id} (expires {})",
                    "Saved".green(),
                    format_ms(record.expiration)
                ),
                None => format!("{} session {id} was not saved", "warning:".yellow()),
            })
        }
        SessionCommand::Remove { id } => {
            let removed = sessions.remove(id).await;
            if json {
                return to_json("session remove", ChangeOutput { id, session: removed });
            }
            Ok(if removed.is_some() {
                format!("{} session {id}", "Removed".green())
            } else {
                format!("No session {id}")
            })
        }
        SessionCommand::Clear => {
            sessions.clear().await;
            if json {
                return to_json("session clear", ListOutput {
                    count: 0,
                    sessions: SessionMap::new(),
                });
            }
            Ok(format!("{} all sessions", "Cleared".green()))
        }
    }
}

fn render_list(sessions: &SessionMap) -> String {
    if sessions.is_empty() {
        return "No active sessions".to_string();
    }

    let mut out = format!("{:<24} {:<24} {}\n", "ID".bold(), "EXPIRES".bold(), "URI".bold());
    for (id, record) in sessions {
        let _ = writeln!(
            out,
            "{id:<24} {:<24} {}",
            format_ms(record.expiration),
            record.uri_string.dimmed()
        );
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use std::sync::Arc;

    fn cache() -> CacheOrchestrator {
        colored::control::set_override(false);
        CacheOrchestrator::with_backend(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn add_list_remove() {
        let cache = cache();
        let add = SessionCommand::Add {
            id: "s1".to_string(),
            uri: "wc:abc@1".to_string(),
            ttl_secs: 60,
        };
        assert!(execute(&add, &cache, false).await.unwrap().starts_with("Saved session s1"));

        let listed = execute(&SessionCommand::List, &cache, false).await.unwrap();
        assert!(listed.contains("s1"));
        assert!(listed.contains("wc:abc@1"));

        let remove = SessionCommand::Remove {
            id: "s1".to_string(),
        };
        assert_eq!(execute(&remove, &cache, false).await.unwrap(), "Removed session s1");
        assert_eq!(execute(&remove, &cache, false).await.unwrap(), "No session s1");
    }

    #[tokio::test]
    async fn zero_ttl_session_is_not_listed() {
        let cache = cache();
        let add = SessionCommand::Add {
            id: "s0".to_string(),
            uri: "wc:zero".to_string(),
            ttl_secs: 0,
        };
        let out = execute(&add, &cache, false).await.unwrap();
        assert!(out.contains("was not saved"));
        assert_eq!(
            execute(&SessionCommand::List, &cache, false).await.unwrap(),
            "No active sessions"
        );
    }

    #[tokio::test]
    async fn list_json_counts_sessions() {
        let cache = cache();
        for id in ["a", "b"] {
            cache
                .sessions()
                .save(id, "wc:x", now_ms() + 60_000)
                .await;
        }

        let out = execute(&SessionCommand::List, &cache, true).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["data"]["count"], 2);
        assert_eq!(value["data"]["sessions"]["a"]["uriString"], "wc:x");
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let cache = cache();
        cache.sessions().save("a", "wc:x", now_ms() + 60_000).await;
        execute(&SessionCommand::Clear, &cache, false).await.unwrap();
        assert!(cache.sessions().list_valid().await.is_empty());
    }
}
