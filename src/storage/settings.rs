//! Global singleton settings.
//!
//! Native currency, language, and cached native prices are stored under their
//! own keys with independent version tags. Defaults are returned on read and
//! never written back.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::models::NativePrices;
use crate::storage::keys::{LANGUAGE_KEY, NATIVE_CURRENCY_KEY, NATIVE_PRICES_KEY, SchemaVersions};
use crate::storage::versioned::VersionedStore;

/// Built-in native currency.
pub const DEFAULT_NATIVE_CURRENCY: &str = "USD";
/// Built-in language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Stored shape of a setting: the value under `data`.
#[derive(Debug, Serialize, Deserialize)]
struct SettingEntry<T> {
    data: T,
}

/// Values returned for settings that were never saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDefaults {
    pub native_currency: String,
    pub language: String,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            native_currency: DEFAULT_NATIVE_CURRENCY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Typed access to the global settings.
#[derive(Debug, Clone)]
pub struct GlobalSettingsCache {
    store: VersionedStore,
    versions: Arc<SchemaVersions>,
    defaults: Arc<SettingsDefaults>,
}

impl GlobalSettingsCache {
    #[must_use]
    pub fn new(
        store: VersionedStore,
        versions: Arc<SchemaVersions>,
        defaults: SettingsDefaults,
    ) -> Self {
        Self {
            store,
            versions,
            defaults: Arc::new(defaults),
        }
    }

    /// Defaults used when a setting is absent.
    #[must_use]
    pub fn defaults(&self) -> &SettingsDefaults {
        &self.defaults
    }

    /// Saved native currency, or the default.
    pub async fn native_currency(&self) -> String {
        self.load(NATIVE_CURRENCY_KEY, &self.versions.native_currency)
            .await
            .unwrap_or_else(|| self.defaults.native_currency.clone())
    }

    pub async fn set_native_currency(&self, currency: &str) {
        self.save(NATIVE_CURRENCY_KEY, &currency, &self.versions.native_currency)
            .await;
    }

    /// Saved language, or the default.
    pub async fn language(&self) -> String {
        self.load(LANGUAGE_KEY, &self.versions.language)
            .await
            .unwrap_or_else(|| self.defaults.language.clone())
    }

    pub async fn set_language(&self, language: &str) {
        self.save(LANGUAGE_KEY, &language, &self.versions.language)
            .await;
    }

    /// Cached native prices. There is no default.
    pub async fn native_prices(&self) -> Option<NativePrices> {
        self.load(NATIVE_PRICES_KEY, &self.versions.native_prices)
            .await
    }

    pub async fn set_native_prices(&self, prices: &NativePrices) {
        self.save(NATIVE_PRICES_KEY, prices, &self.versions.native_prices)
            .await;
    }

    pub async fn remove_native_prices(&self) {
        self.store.remove(NATIVE_PRICES_KEY).await;
    }

    async fn load<T: DeserializeOwned>(&self, key: &str, version: &str) -> Option<T> {
        self.store
            .load::<SettingEntry<T>>(key, version)
            .await
            .map(|entry| entry.data)
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T, version: &str) {
        self.store
            .save(key, &SettingEntry { data: value }, version)
            .await;
        tracing::debug!(key, "Saved setting");
    }
}
