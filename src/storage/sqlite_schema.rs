//! `SQLite` schema and migrations for the cache database.
//!
//! Migrations are numbered SQL files applied in order inside a transaction
//! and recorded in `schema_migrations`, so reopening a database only applies
//! what is new.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::{CacheError, Result};

const CACHE_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("../../migrations/001_cache_entries.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("../../migrations/002_expiry_index.sql"),
    },
];

/// Latest schema version known to this build.
pub const LATEST_SCHEMA_VERSION: i32 = 2;

/// Run schema migrations for the cache database.
///
/// Returns the latest schema version applied.
///
/// # Errors
/// Returns an error if creating the migrations table, reading the schema version,
/// or applying any migration fails.
pub fn run_migrations(conn: &mut Connection) -> Result<i32> {
    ensure_schema_migrations_table(conn)?;

    let mut current_version = get_schema_version(conn)?;

    for migration in CACHE_MIGRATIONS {
        if migration.version > current_version {
            apply_migration(conn, migration)?;
            current_version = migration.version;
        }
    }

    Ok(current_version)
}

/// Timestamp format stored in `expires_at` and `updated_at`.
///
/// Fixed precision keeps lexical order equal to chronological order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Delete entries whose backend expiry has passed.
///
/// Returns the number of rows deleted.
///
/// # Errors
/// Returns an error if the DELETE query fails.
pub fn purge_expired_entries(conn: &Connection) -> Result<usize> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        [now],
    )
    .map_err(|e| CacheError::storage("sqlite", "purge", e))
}

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    sql: &'static str,
}

fn ensure_schema_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
            version INTEGER PRIMARY KEY,\
            applied_at TEXT DEFAULT (datetime('now'))\
        );",
    )
    .map_err(|e| CacheError::storage("sqlite", "create schema_migrations", e))?;

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .map_err(|e| CacheError::storage("sqlite", "read schema version", e))?;

    Ok(version.unwrap_or(0))
}

fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let operation = format!("apply migration {}", migration.version);
    let tx = conn
        .transaction()
        .map_err(|e| CacheError::storage("sqlite", &operation, e))?;

    tx.execute_batch(migration.sql)
        .map_err(|e| CacheError::storage("sqlite", &operation, e))?;

    tx.execute(
        "INSERT INTO schema_migrations (version) VALUES (?1)",
        [migration.version],
    )
    .map_err(|e| CacheError::storage("sqlite", &operation, e))?;

    tx.commit()
        .map_err(|e| CacheError::storage("sqlite", &operation, e))?;

    tracing::debug!(version = migration.version, "Applied cache schema migration");
    Ok(())
}
