//! Raw ledger amounts.
//!
//! Balances on the mirrored network range up to 2^128 − 1 raw, so amounts
//! are stored as `u128` and parsed from the decimal strings the node's RPC
//! emits. Never floats, never `u64`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DecodeError;

/// An amount in raw units (the network's smallest denomination).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RawAmount(u128);

impl RawAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl FromStr for RawAmount {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| DecodeError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("0".parse::<RawAmount>().unwrap(), RawAmount::ZERO);
        assert_eq!(
            "340282366920938463463374607431768211455".parse::<RawAmount>().unwrap(),
            RawAmount::new(u128::MAX)
        );
    }

    #[test]
    fn rejects_non_decimal() {
        assert!("".parse::<RawAmount>().is_err());
        assert!("-1".parse::<RawAmount>().is_err());
        assert!("1.5".parse::<RawAmount>().is_err());
        assert!("0x10".parse::<RawAmount>().is_err());
    }

    #[test]
    fn display_roundtrip() {
        let amount = RawAmount::new(123456789012345678901234567890u128);
        assert_eq!(amount.to_string().parse::<RawAmount>().unwrap(), amount);
    }
}
