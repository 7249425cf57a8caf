//! Cached data models and logging setup.

pub mod logging;
pub mod models;

pub use models::{
    AccountPayload, AccountRecord, Asset, Balances, DisplayAmount, NativePrices, NativeValue,
    NetworkSnapshot, SessionMap, SessionRecord, TOTAL_PLACEHOLDER, Transaction, TransactionSet,
    UniqueToken,
};
