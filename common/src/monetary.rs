//! Currency codes for account balances.
//!
//! Balances and amounts are plain `i64` values in minor currency units; only
//! the currency code travels with an account.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency codes accepted for new accounts.
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["USD", "EUR", "INR"];

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from its code. The code is upper-cased.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    /// US Dollar.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Euro.
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    /// Indian Rupee.
    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Check whether the code is one of [`SUPPORTED_CURRENCIES`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_CURRENCIES.contains(&self.0.as_str())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}
