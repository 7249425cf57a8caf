//! Shared helpers for integration tests.
//!
//! - `log_capture`: collect tracing events for assertions
//! - [`wcache`]: the binary, isolated from the user's config and data dirs

#![allow(dead_code)]

pub mod log_capture;

use std::path::Path;

use assert_cmd::Command;

/// `wcache` with its config and data directories redirected under `home`
/// and every `WCACHE_*` variable cleared.
#[allow(deprecated)]
pub fn wcache(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wcache").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("WCACHE_CONFIG")
        .env_remove("WCACHE_BACKEND")
        .env_remove("WCACHE_STORE_PATH")
        .env_remove("WCACHE_LOG")
        .env_remove("WCACHE_LOG_FORMAT")
        .env_remove("WCACHE_LOG_FILE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// `wcache` with the file backend rooted at `home/store`.
pub fn wcache_file_store(home: &Path) -> Command {
    let mut cmd = wcache(home);
    cmd.arg("--backend")
        .arg("file")
        .arg("--store-path")
        .arg(home.join("store"));
    cmd
}
