//! Cached wallet data models.
//!
//! These types mirror the JSON shapes produced by the balance and transaction
//! fetchers and persisted by the cache. Field names are serialized in
//! camelCase so stored entries stay readable by other clients of the same
//! storage namespace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display value used for a balance total when the fetcher supplied none.
pub const TOTAL_PLACEHOLDER: &str = "———";

// =============================================================================
// Amounts and Assets
// =============================================================================

/// A raw amount paired with its formatted display string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayAmount {
    pub amount: String,
    pub display: String,
}

impl DisplayAmount {
    /// Create an amount with the given raw and display values.
    #[must_use]
    pub fn new(amount: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            display: display.into(),
        }
    }

    /// The sentinel total stored when a payload carries no total.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            amount: String::new(),
            display: TOTAL_PLACEHOLDER.to_string(),
        }
    }

    /// Whether this is the sentinel total.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.amount.is_empty() && self.display == TOTAL_PLACEHOLDER
    }
}

/// Value of an asset holding in the native (fiat) currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NativeValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<DisplayAmount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<DisplayAmount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<DisplayAmount>,
}

/// A fungible asset held by an account.
///
/// Fields the cache does not model are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Asset {
    pub symbol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,

    /// Token contract address; `None` for the chain's native asset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<DisplayAmount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<NativeValue>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Asset {
    /// Create an asset with only a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Account balances: held assets and their aggregate value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub assets: Vec<Asset>,
    pub total: DisplayAmount,
}

// =============================================================================
// Unique Tokens
// =============================================================================

/// A non-fungible token held by an account.
///
/// Fields the cache does not model are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniqueToken {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// =============================================================================
// Transactions
// =============================================================================

/// A transaction touching an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DisplayAmount>,

    /// Unix timestamp in seconds, when mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Not yet confirmed on-chain.
    #[serde(default)]
    pub pending: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Transactions of one account on one network, split by confirmation state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionSet {
    pub settled: Vec<Transaction>,
    pub pending: Vec<Transaction>,
}

impl TransactionSet {
    /// Split transactions by their `pending` flag, preserving input order
    /// within each side.
    #[must_use]
    pub fn partition(transactions: &[Transaction]) -> Self {
        let (pending, settled): (Vec<Transaction>, Vec<Transaction>) =
            transactions.iter().cloned().partition(|tx| tx.pending);
        Self { settled, pending }
    }

    /// Total number of transactions on both sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len() + self.pending.len()
    }

    /// Whether both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty() && self.pending.is_empty()
    }

    /// Settled transactions followed by pending ones.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.settled.iter().chain(self.pending.iter())
    }
}

// =============================================================================
// Account Records
// =============================================================================

/// Everything cached for one account on one network.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkSnapshot {
    /// Wallet classification (e.g. "hardware", "software").
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub wallet_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<Balances>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_tokens: Option<Vec<UniqueToken>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<TransactionSet>,
}

impl NetworkSnapshot {
    /// Whether no sub-object has been cached for this network.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.wallet_type.is_none()
            && self.balances.is_none()
            && self.unique_tokens.is_none()
            && self.transactions.is_none()
    }
}

/// Cached snapshot of an account across networks, keyed by network name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AccountRecord {
    pub networks: BTreeMap<String, NetworkSnapshot>,
}

impl AccountRecord {
    /// Snapshot for a single network.
    #[must_use]
    pub fn network(&self, network: &str) -> Option<&NetworkSnapshot> {
        self.networks.get(network)
    }

    /// Whether no network has cached data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

// =============================================================================
// Fetched Payloads
// =============================================================================

/// Account data as returned by a balance/transaction fetcher.
///
/// Every field is optional on the wire; the cache checks presence of the
/// fields each update needs and skips the update otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub wallet_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<Asset>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<DisplayAmount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
}

// =============================================================================
// Sessions and Prices
// =============================================================================

/// A wallet-connect pairing credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub uri_string: String,
    /// Absolute expiration, Unix epoch milliseconds.
    pub expiration: i64,
}

impl SessionRecord {
    /// Whether the session is still usable at `now_ms`.
    #[must_use]
    pub const fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expiration
    }
}

/// Session id -> pairing record.
pub type SessionMap = BTreeMap<String, SessionRecord>;

/// Cached native-asset prices, keyed by currency code.
///
/// The price shapes come from an external price API and are stored as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct NativePrices(pub BTreeMap<String, Value>);
