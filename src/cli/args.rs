//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Inspect and edit the wallet cache.
#[derive(Parser, Debug)]
#[command(name = "wcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Storage backend (memory, file, sqlite)
    #[arg(long, value_name = "KIND", global = true)]
    pub backend: Option<String>,

    /// Database file (sqlite) or directory (file backend)
    #[arg(long, value_name = "PATH", global = true)]
    pub store_path: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cached account data
    #[command(subcommand)]
    Account(AccountCommand),

    /// Wallet-connect pairing sessions
    #[command(subcommand)]
    Session(SessionCommand),

    /// Global settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// Account subcommands.
#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Show what is cached for an address
    Show {
        /// Account address (case-insensitive)
        address: String,

        /// Only this network
        #[arg(long, value_name = "NETWORK")]
        network: Option<String>,
    },

    /// Store a fetched account payload (JSON file, `-` for stdin)
    Import {
        /// Account address; overrides the payload's own address
        address: String,

        /// Network the payload was fetched from
        #[arg(long, value_name = "NETWORK", default_value = "mainnet")]
        network: String,

        /// Payload file with `type`, `assets`, `total`, `transactions`
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete everything cached for an address, and cached native prices
    Reset {
        /// Account address (case-insensitive)
        address: String,
    },
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// List sessions that have not expired
    List,

    /// Add or replace a session
    Add {
        /// Session id
        id: String,

        /// Pairing URI
        uri: String,

        /// Seconds until the session expires
        #[arg(long, value_name = "SECONDS", default_value_t = 86_400)]
        ttl_secs: u64,
    },

    /// Remove a session
    Remove {
        /// Session id
        id: String,
    },

    /// Remove every session
    Clear,
}

/// Settings subcommands.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show current settings
    Show,

    /// Change a setting
    Set {
        /// Setting to change
        #[arg(value_enum)]
        key: SettingKey,

        /// New value
        value: String,
    },
}

/// Settings editable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingKey {
    /// Native (fiat) display currency
    Currency,
    /// Interface language
    Language,
}
