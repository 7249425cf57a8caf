//! `wcache account` commands.

use std::fmt::Write as _;
use std::io::Read as _;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::AccountCommand;
use crate::cli::output::to_json;
use crate::core::models::{AccountPayload, AccountRecord, NetworkSnapshot};
use crate::error::{CacheError, Result};
use crate::storage::CacheOrchestrator;
use crate::storage::keys::normalize_address;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput<'a> {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<&'a str>,
    found: bool,
    networks: AccountRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportOutput<'a> {
    address: String,
    network: &'a str,
    assets: usize,
    transactions: usize,
    failed_writes: u64,
}

#[derive(Debug, Serialize)]
struct ResetOutput {
    address: String,
}

/// Run an account subcommand and return what to print.
///
/// # Errors
/// Returns an error if an import payload cannot be read or parsed.
pub async fn execute(cmd: &AccountCommand, cache: &CacheOrchestrator, json: bool) -> Result<String> {
    match cmd {
        AccountCommand::Show { address, network } => {
            show(cache, address, network.as_deref(), json).await
        }
        AccountCommand::Import {
            address,
            network,
            file,
        } => import(cache, address, network, file, json).await,
        AccountCommand::Reset { address } => {
            cache.reset(address).await;
            let address = normalize_address(address);
            if json {
                to_json("account reset", ResetOutput { address })
            } else {
                Ok(format!("{} cache for {address}", "Reset".green()))
            }
        }
    }
}

async fn show(
    cache: &CacheOrchestrator,
    address: &str,
    network: Option<&str>,
    json: bool,
) -> Result<String> {
    let record = match network {
        Some(network) => cache
            .accounts()
            .get_network(address, network)
            .await
            .map(|snapshot| AccountRecord {
                networks: [(network.to_string(), snapshot)].into_iter().collect(),
            }),
        None => cache.accounts().get_account(address).await,
    };
    let address = normalize_address(address);

    if json {
        return to_json(
            "account show",
            ShowOutput {
                address,
                network,
                found: record.is_some(),
                networks: record.unwrap_or_default(),
            },
        );
    }

    let Some(record) = record else {
        return Ok(format!("No cached data for {address}"));
    };

    let mut out = format!("{}\n", address.bold());
    for (name, snapshot) in &record.networks {
        render_network(&mut out, name, snapshot);
    }
    Ok(out.trim_end().to_string())
}

fn render_network(out: &mut String, name: &str, snapshot: &NetworkSnapshot) {
    let kind = snapshot.wallet_type.as_deref().unwrap_or("unknown");
    let _ = writeln!(out, "\n{} ({kind})", name.cyan().bold());

    if let Some(balances) = &snapshot.balances {
        let _ = writeln!(out, "  Total: {}", balances.total.display.green());
        for asset in &balances.assets {
            let balance = asset
                .balance
                .as_ref()
                .map_or("-", |b| b.display.as_str());
            let _ = writeln!(out, "    {:<8} {balance}", asset.symbol);
        }
    }
    if let Some(tokens) = &snapshot.unique_tokens {
        let _ = writeln!(out, "  Unique tokens: {}", tokens.len());
    }
    if let Some(transactions) = &snapshot.transactions {
        let _ = writeln!(
            out,
            "  Transactions: {} settled, {} pending",
            transactions.settled.len(),
            transactions.pending.len().to_string().yellow()
        );
    }
}

async fn import(
    cache: &CacheOrchestrator,
    address: &str,
    network: &str,
    file: &Path,
    json: bool,
) -> Result<String> {
    if normalize_address(address).is_empty() {
        return Err(CacheError::MalformedPayload {
            operation: "account import".to_string(),
            field: "address".to_string(),
        });
    }

    let mut payload: AccountPayload = serde_json::from_str(&read_payload(file)?)?;
    if payload.assets.is_none() {
        return Err(CacheError::MalformedPayload {
            operation: "account import".to_string(),
            field: "assets".to_string(),
        });
    }
    payload.address = Some(address.to_string());

    let failed_before = cache.store().metrics().snapshot().suppressed_errors;
    cache.apply_account_fetch(&payload, network).await;
    let failed_writes = cache.store().metrics().snapshot().suppressed_errors - failed_before;

    let output = ImportOutput {
        address: normalize_address(address),
        network,
        assets: payload.assets.as_ref().map_or(0, Vec::len),
        transactions: payload.transactions.as_ref().map_or(0, Vec::len),
        failed_writes,
    };

    if json {
        return to_json("account import", output);
    }

    let mut out = format!(
        "{} {} assets and {} transactions for {} on {}",
        "Imported".green(),
        output.assets,
        output.transactions,
        output.address,
        output.network
    );
    if failed_writes > 0 {
        let _ = write!(
            out,
            "\n{} {failed_writes} cache writes failed; rerun with --verbose for details",
            "warning:".yellow()
        );
    }
    Ok(out)
}

fn read_payload(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    std::fs::read_to_string(file).map_err(|e| {
        CacheError::Other(anyhow::anyhow!(
            "cannot read payload file {}: {e}",
            file.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::test_utils::{TestDir, make_payload};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn cache() -> CacheOrchestrator {
        colored::control::set_override(false);
        CacheOrchestrator::with_backend(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn show_unknown_account() {
        let out = execute(
            &AccountCommand::Show {
                address: "0xdead".to_string(),
                network: None,
            },
            &cache(),
            false,
        )
        .await
        .unwrap();
        assert_eq!(out, "No cached data for 0xdead");
    }

    #[tokio::test]
    async fn import_then_show() {
        let dir = TestDir::new();
        dir.create_file(
            "payload.json",
            r#"{"type":"hardware","assets":[{"symbol":"ETH","balance":{"amount":"2","display":"2 ETH"}}],
                "total":{"amount":"4000","display":"$4,000.00"},
                "transactions":[{"hash":"0x1","pending":true},{"hash":"0x2","pending":false}]}"#,
        );
        let cache = cache();

        let out = execute(
            &AccountCommand::Import {
                address: "0xABC".to_string(),
                network: "mainnet".to_string(),
                file: dir.file_path("payload.json"),
            },
            &cache,
            false,
        )
        .await
        .unwrap();
        assert!(out.contains("1 assets and 2 transactions for 0xabc on mainnet"));

        let shown = execute(
            &AccountCommand::Show {
                address: "0xabc".to_string(),
                network: Some("mainnet".to_string()),
            },
            &cache,
            false,
        )
        .await
        .unwrap();
        assert!(shown.contains("mainnet (hardware)"));
        assert!(shown.contains("Total: $4,000.00"));
        assert!(shown.contains("1 settled, 1 pending"));
    }

    #[tokio::test]
    async fn import_without_assets_is_rejected() {
        let dir = TestDir::new();
        dir.create_file("payload.json", r#"{"type":"software"}"#);

        let err = execute(
            &AccountCommand::Import {
                address: "0xabc".to_string(),
                network: "mainnet".to_string(),
                file: dir.file_path("payload.json"),
            },
            &cache(),
            true,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-P001");
    }

    #[tokio::test]
    async fn import_with_blank_address_is_rejected() {
        let dir = TestDir::new();
        dir.create_file("payload.json", r#"{"assets":[{"symbol":"ETH"}]}"#);
        let cache = cache();

        let err = execute(
            &AccountCommand::Import {
                address: "   ".to_string(),
                network: "mainnet".to_string(),
                file: dir.file_path("payload.json"),
            },
            &cache,
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "WCACHE-P001");
        assert!(err.to_string().contains("address"));
        assert_eq!(cache.store().metrics().snapshot().writes, 0);
    }

    #[tokio::test]
    async fn import_missing_file_errors() {
        let err = execute(
            &AccountCommand::Import {
                address: "0xabc".to_string(),
                network: "mainnet".to_string(),
                file: PathBuf::from("/nonexistent/payload.json"),
            },
            &cache(),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cannot read payload file"));
    }

    #[tokio::test]
    async fn show_json_lists_networks() {
        let cache = cache();
        cache
            .apply_account_fetch(&make_payload("0xabc", &["ETH"]), "mainnet")
            .await;

        let out = execute(
            &AccountCommand::Show {
                address: "0xABC".to_string(),
                network: None,
            },
            &cache,
            true,
        )
        .await
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["data"]["found"], true);
        assert_eq!(
            value["data"]["networks"]["mainnet"]["balances"]["total"]["display"],
            "$10.00"
        );
    }

    #[tokio::test]
    async fn reset_reports_normalized_address() {
        let out = execute(
            &AccountCommand::Reset {
                address: "0xABC".to_string(),
            },
            &cache(),
            false,
        )
        .await
        .unwrap();
        assert_eq!(out, "Reset cache for 0xabc");
    }
}
