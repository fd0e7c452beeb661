//! Block hash type for the mirrored block-lattice.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DecodeError;

/// A 32-byte block hash, identifying a block in an account's chain.
///
/// The all-zero value is the sentinel `previous` pointer carried by every
/// height-1 (open) block; it never names a real block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl Default for BlockHash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string as produced by the node's RPC.
    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        if s.len() != 64 {
            return Err(DecodeError::InvalidHash(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| DecodeError::InvalidHash(s.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Uppercase hex form, matching the node's wire representation.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in &self.0 {
            out.push_str(&format!("{:02X}", b));
        }
        out
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02X}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hash = BlockHash::new([0xAB; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(BlockHash::from_hex(&hex).unwrap(), hash);
    }

    #[test]
    fn from_hex_accepts_lowercase() {
        let hex = "ab".repeat(32);
        assert_eq!(BlockHash::from_hex(&hex).unwrap(), BlockHash::new([0xAB; 32]));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(BlockHash::from_hex("").is_err());
        assert!(BlockHash::from_hex(&"g".repeat(64)).is_err());
        assert!(BlockHash::from_hex(&"0".repeat(63)).is_err());
    }

    #[test]
    fn zero_sentinel() {
        assert!(BlockHash::ZERO.is_zero());
        assert_eq!(BlockHash::from_hex(&"0".repeat(64)).unwrap(), BlockHash::ZERO);
    }
}
