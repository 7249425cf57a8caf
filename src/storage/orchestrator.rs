//! Entry points that take freshly fetched data and persist it.
//!
//! The orchestrator owns one versioned store and the caches built on it.
//! Fetchers hand it whole payloads; it decides which account sections each
//! payload updates. `hydrate` reads everything the app needs at startup.

use std::sync::Arc;

use serde::Serialize;

use crate::core::models::{
    AccountPayload, NativePrices, NetworkSnapshot, Transaction, UniqueToken,
};
use crate::error::CacheError;
use crate::storage::account::AccountCache;
use crate::storage::backend::StorageBackend;
use crate::storage::keys::SchemaVersions;
use crate::storage::session::SessionStore;
use crate::storage::settings::{GlobalSettingsCache, SettingsDefaults};
use crate::storage::versioned::VersionedStore;

/// Account and settings state read back for one address and network.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedState {
    pub address: String,
    pub network: String,
    pub account: Option<NetworkSnapshot>,
    pub native_currency: String,
    pub language: String,
    pub native_prices: Option<NativePrices>,
}

/// Wires the caches over a single backend.
#[derive(Debug, Clone)]
pub struct CacheOrchestrator {
    store: VersionedStore,
    accounts: AccountCache,
    sessions: SessionStore,
    settings: GlobalSettingsCache,
}

impl CacheOrchestrator {
    #[must_use]
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        versions: SchemaVersions,
        defaults: SettingsDefaults,
    ) -> Self {
        let store = VersionedStore::new(backend);
        let versions = Arc::new(versions);
        let settings = GlobalSettingsCache::new(store.clone(), versions.clone(), defaults);
        let accounts = AccountCache::new(store.clone(), settings.clone(), versions.clone());
        let sessions = SessionStore::new(store.clone(), versions.sessions.clone());

        tracing::debug!(backend = store.backend_name(), "Cache orchestrator ready");
        Self {
            store,
            accounts,
            sessions,
            settings,
        }
    }

    /// Orchestrator with built-in versions and defaults.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self::new(backend, SchemaVersions::default(), SettingsDefaults::default())
    }

    #[must_use]
    pub const fn accounts(&self) -> &AccountCache {
        &self.accounts
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub const fn settings(&self) -> &GlobalSettingsCache {
        &self.settings
    }

    /// The shared versioned store (for metrics).
    #[must_use]
    pub const fn store(&self) -> &VersionedStore {
        &self.store
    }

    /// Persist a balance fetch: balances always, transactions when present.
    ///
    /// Does nothing when the payload has no address.
    pub async fn apply_account_fetch(&self, payload: &AccountPayload, network: &str) {
        let Some(address) = payload.address.as_deref().filter(|a| !a.trim().is_empty()) else {
            skip("apply_account_fetch", "address");
            return;
        };

        self.accounts.update_balances(address, payload, network).await;
        if let Some(transactions) = &payload.transactions {
            self.accounts
                .update_transactions(address, transactions, network)
                .await;
        }
    }

    /// Persist a unique token fetch.
    pub async fn apply_unique_tokens(
        &self,
        address: &str,
        tokens: Option<&[UniqueToken]>,
        network: &str,
    ) {
        match tokens {
            Some(tokens) => {
                self.accounts
                    .update_unique_tokens(address, tokens, network)
                    .await;
            }
            None => skip("apply_unique_tokens", "tokens"),
        }
    }

    /// Persist a transaction fetch.
    pub async fn apply_transactions(
        &self,
        address: &str,
        transactions: Option<&[Transaction]>,
        network: &str,
    ) {
        match transactions {
            Some(transactions) => {
                self.accounts
                    .update_transactions(address, transactions, network)
                    .await;
            }
            None => skip("apply_transactions", "transactions"),
        }
    }

    /// Read back what is cached for `address` on `network` plus the settings.
    pub async fn hydrate(&self, address: &str, network: &str) -> HydratedState {
        let (account, native_currency, language, native_prices) = tokio::join!(
            self.accounts.get_network(address, network),
            self.settings.native_currency(),
            self.settings.language(),
            self.settings.native_prices(),
        );

        HydratedState {
            address: crate::storage::keys::normalize_address(address),
            network: network.to_string(),
            account,
            native_currency,
            language,
            native_prices,
        }
    }

    /// Forget `address` and the cached native prices.
    pub async fn reset(&self, address: &str) {
        self.accounts.reset_account(address).await;
    }
}

fn skip(operation: &str, field: &str) {
    let err = CacheError::MalformedPayload {
        operation: operation.to_string(),
        field: field.to_string(),
    };
    tracing::debug!(error_code = err.error_code(), error = %err, "Skipping cache update");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;
    use crate::test_utils::{make_payload, make_transaction};

    fn orchestrator() -> (CacheOrchestrator, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (CacheOrchestrator::with_backend(backend.clone()), backend)
    }

    #[tokio::test]
    async fn account_fetch_updates_balances_and_transactions() {
        let (cache, _) = orchestrator();
        let mut payload = make_payload("0xAbC", &["ETH", "DAI"]);
        payload.transactions = Some(vec![
            make_transaction("p", true),
            make_transaction("s", false),
        ]);

        cache.apply_account_fetch(&payload, "mainnet").await;

        let snapshot = cache.accounts().get_network("0xabc", "mainnet").await.unwrap();
        assert_eq!(snapshot.balances.unwrap().assets.len(), 2);
        let transactions = snapshot.transactions.unwrap();
        assert_eq!(transactions.pending[0].hash, "p");
        assert_eq!(transactions.settled[0].hash, "s");
    }

    #[tokio::test]
    async fn account_fetch_without_transactions_keeps_old_ones() {
        let (cache, _) = orchestrator();
        cache
            .apply_transactions("0xa", Some(&[make_transaction("t", false)][..]), "mainnet")
            .await;
        cache
            .apply_account_fetch(&make_payload("0xa", &["ETH"]), "mainnet")
            .await;

        let snapshot = cache.accounts().get_network("0xa", "mainnet").await.unwrap();
        assert_eq!(snapshot.transactions.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_inputs_are_noops() {
        let (cache, backend) = orchestrator();
        let mut payload = make_payload("", &["ETH"]);
        cache.apply_account_fetch(&payload, "mainnet").await;
        payload.address = None;
        cache.apply_account_fetch(&payload, "mainnet").await;
        cache.apply_unique_tokens("0xa", None, "mainnet").await;
        cache.apply_transactions("0xa", None, "mainnet").await;

        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn hydrate_combines_account_and_settings() {
        let (cache, _) = orchestrator();
        cache
            .apply_account_fetch(&make_payload("0xa", &["ETH"]), "mainnet")
            .await;
        cache.settings().set_native_currency("EUR").await;

        let state = cache.hydrate("0xA", "mainnet").await;
        assert_eq!(state.address, "0xa");
        assert!(state.account.is_some());
        assert_eq!(state.native_currency, "EUR");
        assert_eq!(state.language, "en");
        assert!(state.native_prices.is_none());

        let empty = cache.hydrate("0xa", "ropsten").await;
        assert!(empty.account.is_none());
    }

    #[tokio::test]
    async fn reset_cascades() {
        let (cache, backend) = orchestrator();
        cache
            .apply_unique_tokens("0xa", Some(&[][..]), "mainnet")
            .await;
        cache
            .settings()
            .set_native_prices(&NativePrices::default())
            .await;

        cache.reset("0xa").await;
        assert!(backend.is_empty().await);
    }
}
