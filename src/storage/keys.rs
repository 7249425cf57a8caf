//! Storage key namespace and schema versions.
//!
//! Layout:
//! - `accountCache:{address}` - index of networks cached for an address
//! - `accountCache:{address}:{network}:balances`
//! - `accountCache:{address}:{network}:uniqueTokens`
//! - `accountCache:{address}:{network}:transactions`
//! - `walletconnect` - all pairing sessions
//! - `nativeCurrency`, `language`, `nativePrices` - global settings
//!
//! Addresses are lowercased before they become part of a key; nothing else
//! builds account keys. Address and network components have `%` and `:`
//! percent-encoded, so a component can never spill into the next segment
//! and every key under [`AccountKeys::prefix`] belongs to one address.

/// Prefix of every per-account key.
pub const ACCOUNT_PREFIX: &str = "accountCache";
/// Key of the session collection.
pub const SESSIONS_KEY: &str = "walletconnect";
/// Key of the native currency setting.
pub const NATIVE_CURRENCY_KEY: &str = "nativeCurrency";
/// Key of the language setting.
pub const LANGUAGE_KEY: &str = "language";
/// Key of the cached native prices.
pub const NATIVE_PRICES_KEY: &str = "nativePrices";

/// Sub-objects stored per account and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountSection {
    Balances,
    UniqueTokens,
    Transactions,
}

impl AccountSection {
    /// Every section, in storage order.
    pub const ALL: [Self; 3] = [Self::Balances, Self::UniqueTokens, Self::Transactions];

    /// Key suffix of the section.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Balances => "balances",
            Self::UniqueTokens => "uniqueTokens",
            Self::Transactions => "transactions",
        }
    }
}

/// Key builder for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeys {
    address: String,
    segment: String,
}

impl AccountKeys {
    /// Keys for `address`, or `None` if the address is blank.
    #[must_use]
    pub fn new(address: &str) -> Option<Self> {
        let address = normalize_address(address);
        if address.is_empty() {
            return None;
        }
        let segment = escape_segment(&address);
        Some(Self { address, segment })
    }

    /// The normalized address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Key of the network index.
    #[must_use]
    pub fn index(&self) -> String {
        format!("{ACCOUNT_PREFIX}:{}", self.segment)
    }

    /// Common prefix of every section key of this account.
    ///
    /// Neither the index key nor any key of another address starts with it.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{ACCOUNT_PREFIX}:{}:", self.segment)
    }

    /// Key of one section on one network.
    #[must_use]
    pub fn section(&self, network: &str, section: AccountSection) -> String {
        format!(
            "{}{}:{}",
            self.prefix(),
            escape_segment(network),
            section.as_str()
        )
    }

    /// All section keys of one network.
    #[must_use]
    pub fn network_keys(&self, network: &str) -> [String; 3] {
        AccountSection::ALL.map(|section| self.section(network, section))
    }
}

/// Lowercase and trim an address.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Percent-encode the characters that delimit key segments.
fn escape_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    out
}

/// Version tag expected for each stored entry kind.
///
/// Bump a version when the shape of its entry changes; entries written with
/// the previous tag are evicted on their next read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersions {
    pub account_index: String,
    pub balances: String,
    pub unique_tokens: String,
    pub transactions: String,
    pub sessions: String,
    pub native_currency: String,
    pub language: String,
    pub native_prices: String,
}

impl Default for SchemaVersions {
    fn default() -> Self {
        Self {
            account_index: "0.1.0".to_string(),
            balances: "0.1.0".to_string(),
            unique_tokens: "0.2.0".to_string(),
            transactions: "0.2.5".to_string(),
            sessions: "0.1.0".to_string(),
            native_currency: "0.1.0".to_string(),
            language: "0.1.0".to_string(),
            native_prices: "0.1.0".to_string(),
        }
    }
}

impl SchemaVersions {
    /// Version tag for an account section.
    #[must_use]
    pub fn section(&self, section: AccountSection) -> &str {
        match section {
            AccountSection::Balances => &self.balances,
            AccountSection::UniqueTokens => &self.unique_tokens,
            AccountSection::Transactions => &self.transactions,
        }
    }
}
