//! `wcache settings` commands.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::{SettingKey, SettingsCommand};
use crate::cli::output::to_json;
use crate::error::Result;
use crate::storage::CacheOrchestrator;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsOutput {
    native_currency: String,
    language: String,
    native_prices_cached: bool,
}

#[derive(Debug, Serialize)]
struct SetOutput<'a> {
    key: &'a str,
    value: String,
}

/// Run a settings subcommand and return what to print.
///
/// # Errors
/// Returns an error only if JSON output cannot be serialized.
pub async fn execute(cmd: &SettingsCommand, cache: &CacheOrchestrator, json: bool) -> Result<String> {
    let settings = cache.settings();
    match cmd {
        SettingsCommand::Show => {
            let output = SettingsOutput {
                native_currency: settings.native_currency().await,
                language: settings.language().await,
                native_prices_cached: settings.native_prices().await.is_some(),
            };
            if json {
                return to_json("settings show", output);
            }
            let prices = if output.native_prices_cached {
                "cached".green()
            } else {
                "none".dimmed()
            };
            Ok(format!(
                "Native currency: {}\nLanguage:        {}\nNative prices:   {prices}",
                output.native_currency.bold(),
                output.language.bold()
            ))
        }
        SettingsCommand::Set { key, value } => {
            let value = value.trim();
            let (name, stored) = match key {
                SettingKey::Currency => {
                    let currency = value.to_uppercase();
                    settings.set_native_currency(&currency).await;
                    ("currency", settings.native_currency().await)
                }
                SettingKey::Language => {
                    settings.set_language(value).await;
                    ("language", settings.language().await)
                }
            };
            if json {
                return to_json("settings set", SetOutput { key: name, value: stored });
            }
            Ok(format!("{} {name} = {stored}", "Set".green()))
        }
    }
}
