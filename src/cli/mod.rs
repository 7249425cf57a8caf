//! CLI argument parsing and command dispatch.

pub mod account;
pub mod args;
pub mod output;
pub mod session;
pub mod settings;

pub use args::{Cli, Commands};

use crate::error::Result;
use crate::storage::config::ResolvedConfig;
use crate::storage::{CacheOrchestrator, SchemaVersions, open_backend};

/// Resolve configuration, open the cache, and run the requested command.
///
/// Returns the text to print on stdout.
///
/// # Errors
/// Returns an error if configuration is invalid, the backend cannot be
/// opened, or the command itself fails.
pub async fn run(cli: &Cli) -> Result<String> {
    let config = ResolvedConfig::resolve(cli)?;
    if config.no_color {
        colored::control::set_override(false);
    }

    let backend = open_backend(config.backend, config.store_path.clone())?;
    let cache = CacheOrchestrator::new(backend, SchemaVersions::default(), config.defaults.clone());

    let output = match &cli.command {
        Commands::Account(cmd) => account::execute(cmd, &cache, cli.json).await?,
        Commands::Session(cmd) => session::execute(cmd, &cache, cli.json).await?,
        Commands::Settings(cmd) => settings::execute(cmd, &cache, cli.json).await?,
    };

    let metrics = cache.store().metrics().snapshot();
    tracing::debug!(
        reads = metrics.reads,
        writes = metrics.writes,
        stale_evictions = metrics.stale_evictions,
        suppressed_errors = metrics.suppressed_errors,
        "Cache activity"
    );

    Ok(output)
}
