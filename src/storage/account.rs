//! Per-account, per-network cache of balances, unique tokens, and transactions.
//!
//! Each `(address, network, section)` triple is its own storage key, so an
//! update only ever writes the section it owns. A small index entry per
//! address records which networks have data; its read-modify-write runs
//! under an in-process lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::models::{
    AccountPayload, AccountRecord, Balances, DisplayAmount, NetworkSnapshot, Transaction,
    TransactionSet, UniqueToken,
};
use crate::error::CacheError;
use crate::storage::keys::{AccountKeys, AccountSection, SchemaVersions};
use crate::storage::settings::GlobalSettingsCache;
use crate::storage::versioned::VersionedStore;

/// Networks that have cached data for an address.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountIndex {
    #[serde(default)]
    networks: BTreeSet<String>,
}

/// Stored shape of the balances section.
#[derive(Debug, Serialize, Deserialize)]
struct BalancesEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    wallet_type: Option<String>,
    balances: Balances,
}

/// Stored shape of the unique tokens section.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniqueTokensEntry {
    unique_tokens: Vec<UniqueToken>,
}

/// Account cache over a versioned store.
#[derive(Debug, Clone)]
pub struct AccountCache {
    store: VersionedStore,
    settings: GlobalSettingsCache,
    versions: Arc<SchemaVersions>,
    index_lock: Arc<Mutex<()>>,
}

impl AccountCache {
    /// `settings` receives the native prices removal when an account is reset.
    #[must_use]
    pub fn new(
        store: VersionedStore,
        settings: GlobalSettingsCache,
        versions: Arc<SchemaVersions>,
    ) -> Self {
        Self {
            store,
            settings,
            versions,
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Everything cached for `address`, keyed by network.
    ///
    /// Returns `None` when nothing is cached or the address is blank.
    pub async fn get_account(&self, address: &str) -> Option<AccountRecord> {
        let keys = AccountKeys::new(address)?;
        let index: AccountIndex = self
            .store
            .load(&keys.index(), &self.versions.account_index)
            .await?;

        let snapshots = join_all(
            index
                .networks
                .iter()
                .map(|network| self.read_network(&keys, network)),
        )
        .await;

        let networks: std::collections::BTreeMap<_, _> = index
            .networks
            .into_iter()
            .zip(snapshots)
            .filter_map(|(network, snapshot)| snapshot.map(|s| (network, s)))
            .collect();

        if networks.is_empty() {
            return None;
        }
        Some(AccountRecord { networks })
    }

    /// What is cached for `address` on a single network.
    pub async fn get_network(&self, address: &str, network: &str) -> Option<NetworkSnapshot> {
        let keys = AccountKeys::new(address)?;
        self.read_network(&keys, network).await
    }

    /// Networks listed in the account index.
    pub async fn networks(&self, address: &str) -> Vec<String> {
        let Some(keys) = AccountKeys::new(address) else {
            return Vec::new();
        };
        self.store
            .load::<AccountIndex>(&keys.index(), &self.versions.account_index)
            .await
            .map(|index| index.networks.into_iter().collect())
            .unwrap_or_default()
    }

    /// Delete every entry of `address` and the shared native prices.
    ///
    /// Section keys are found by prefix, so entries are removed even when the
    /// index is stale or was already evicted.
    pub async fn reset_account(&self, address: &str) {
        if let Some(keys) = AccountKeys::new(address) {
            let _guard = self.index_lock.lock().await;
            let section_keys = self.store.keys_with_prefix(&keys.prefix()).await;

            join_all(section_keys.iter().map(|key| self.store.remove(key))).await;
            self.store.remove(&keys.index()).await;
            tracing::info!(
                address = keys.address(),
                entries = section_keys.len(),
                "Reset account cache"
            );
        }
        self.settings.remove_native_prices().await;
    }

    /// Replace the wallet type and balances for `address` on `network`.
    ///
    /// Skipped when the address is blank or the payload has no assets. A
    /// missing total is stored as the placeholder total.
    pub async fn update_balances(&self, address: &str, payload: &AccountPayload, network: &str) {
        let Some(keys) = keys_for(address, "update_balances") else {
            return;
        };
        let Some(assets) = &payload.assets else {
            skip("update_balances", "assets");
            return;
        };

        let entry = BalancesEntry {
            wallet_type: payload.wallet_type.clone(),
            balances: Balances {
                assets: assets.clone(),
                total: payload
                    .total
                    .clone()
                    .unwrap_or_else(DisplayAmount::placeholder),
            },
        };
        self.write_section(&keys, network, AccountSection::Balances, &entry)
            .await;
    }

    /// Replace the unique tokens for `address` on `network`.
    pub async fn update_unique_tokens(&self, address: &str, tokens: &[UniqueToken], network: &str) {
        let Some(keys) = keys_for(address, "update_unique_tokens") else {
            return;
        };
        let entry = UniqueTokensEntry {
            unique_tokens: tokens.to_vec(),
        };
        self.write_section(&keys, network, AccountSection::UniqueTokens, &entry)
            .await;
    }

    /// Replace the transactions for `address` on `network`, split by their
    /// `pending` flag with input order kept on each side.
    pub async fn update_transactions(
        &self,
        address: &str,
        transactions: &[Transaction],
        network: &str,
    ) {
        let Some(keys) = keys_for(address, "update_transactions") else {
            return;
        };
        let set = TransactionSet::partition(transactions);
        tracing::debug!(
            address = keys.address(),
            network,
            settled = set.settled.len(),
            pending = set.pending.len(),
            "Partitioned transactions"
        );
        self.write_section(&keys, network, AccountSection::Transactions, &set)
            .await;
    }

    async fn read_network(&self, keys: &AccountKeys, network: &str) -> Option<NetworkSnapshot> {
        let versions = &self.versions;
        let balances_key = keys.section(network, AccountSection::Balances);
        let tokens_key = keys.section(network, AccountSection::UniqueTokens);
        let transactions_key = keys.section(network, AccountSection::Transactions);

        let (balances, tokens, transactions) = tokio::join!(
            self.store
                .load::<BalancesEntry>(&balances_key, &versions.balances),
            self.store
                .load::<UniqueTokensEntry>(&tokens_key, &versions.unique_tokens),
            self.store
                .load::<TransactionSet>(&transactions_key, &versions.transactions),
        );

        let (wallet_type, balances) = match balances {
            Some(entry) => (entry.wallet_type, Some(entry.balances)),
            None => (None, None),
        };
        let snapshot = NetworkSnapshot {
            wallet_type,
            balances,
            unique_tokens: tokens.map(|entry| entry.unique_tokens),
            transactions,
        };

        (!snapshot.is_empty()).then_some(snapshot)
    }

    async fn write_section<T: Serialize>(
        &self,
        keys: &AccountKeys,
        network: &str,
        section: AccountSection,
        entry: &T,
    ) {
        let key = keys.section(network, section);
        self.store
            .save(&key, entry, self.versions.section(section))
            .await;
        self.register_network(keys, network).await;
    }

    async fn register_network(&self, keys: &AccountKeys, network: &str) {
        let _guard = self.index_lock.lock().await;
        let index_key = keys.index();
        let mut index: AccountIndex = self
            .store
            .load(&index_key, &self.versions.account_index)
            .await
            .unwrap_or_default();

        if index.networks.insert(network.to_string()) {
            self.store
                .save(&index_key, &index, &self.versions.account_index)
                .await;
        }
    }
}

fn keys_for(address: &str, operation: &str) -> Option<AccountKeys> {
    let keys = AccountKeys::new(address);
    if keys.is_none() {
        skip(operation, "address");
    }
    keys
}

fn skip(operation: &str, field: &str) {
    let err = CacheError::MalformedPayload {
        operation: operation.to_string(),
        field: field.to_string(),
    };
    tracing::debug!(error_code = err.error_code(), error = %err, "Skipping cache update");
}
