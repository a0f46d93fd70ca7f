//! # Amounts and Currencies
//!
//! Contributions are integers in the currency's smallest unit. The vault
//! never does float arithmetic on money; every sum goes through the checked
//! operations here.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Currency denomination of a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// USD Coin, 6 decimals.
    Usdc,
    /// Ether, 18 decimals.
    Eth,
    /// Dai, 18 decimals.
    Dai,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Currency; 3] = [Currency::Usdc, Currency::Eth, Currency::Dai];

    /// Ticker symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usdc => "USDC",
            Self::Eth => "ETH",
            Self::Dai => "DAI",
        }
    }

    /// Number of decimal places in one whole unit.
    pub fn decimals(&self) -> u32 {
        match self {
            Self::Usdc => 6,
            Self::Eth | Self::Dai => 18,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USDC" => Ok(Self::Usdc),
            "ETH" => Ok(Self::Eth),
            "DAI" => Ok(Self::Dai),
            _ => Err(ValidationError::UnknownCurrency(s.to_string())),
        }
    }
}

/// A non-negative amount in the smallest unit of a currency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw minor-unit value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw minor-unit value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns true for the zero amount.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Result<Amount, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| ValidationError::AmountOverflow(format!("{} + {}", self.0, other.0)))
    }

    /// Checked multiplication by a count (e.g. members or rounds).
    pub fn checked_mul(self, factor: u64) -> Result<Amount, ValidationError> {
        self.0
            .checked_mul(factor)
            .map(Amount)
            .ok_or_else(|| ValidationError::AmountOverflow(format!("{} * {factor}", self.0)))
    }

    /// Subtraction that stops at zero.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("usdc".parse::<Currency>().unwrap(), Currency::Usdc);
        assert_eq!("ETH".parse::<Currency>().unwrap(), Currency::Eth);
        assert!("BTC".parse::<Currency>().is_err());
    }

    #[test]
    fn currency_serializes_as_ticker() {
        assert_eq!(serde_json::to_string(&Currency::Dai).unwrap(), "\"DAI\"");
        let c: Currency = serde_json::from_str("\"USDC\"").unwrap();
        assert_eq!(c, Currency::Usdc);
    }

    #[test]
    fn amount_checked_add_overflows() {
        assert_eq!(Amount(10).checked_add(Amount(20)).unwrap(), Amount(30));
        assert!(Amount(u64::MAX).checked_add(Amount(1)).is_err());
    }

    #[test]
    fn amount_checked_mul() {
        assert_eq!(Amount(100).checked_mul(5).unwrap(), Amount(500));
        assert!(Amount(u64::MAX).checked_mul(2).is_err());
    }

    #[test]
    fn amount_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Amount(42)).unwrap(), "42");
    }
}
