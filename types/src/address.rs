//! Ledger account addresses.
//!
//! An address is `<prefix>_<52 chars key><8 chars checksum>` where the key
//! portion base32-encodes the account's 256-bit public key (4 leading pad
//! bits, alphabet below) and the checksum is the byte-reversed 5-byte
//! Blake2b digest of the key. The mirror derives public keys locally from
//! the address rather than asking the node for them.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{ADDRESS_CHECKSUM_CHARS, ADDRESS_KEY_CHARS};
use crate::DecodeError;

/// The base32 alphabet used by the mirrored network's addresses. Note the
/// characters are in ascending ASCII order, so the lexicographic order of
/// encoded addresses matches the numeric order of public keys — the
/// property the `ledger` pagination cursor relies on.
const ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

fn digit(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

/// A ledger account address.
///
/// Construction does not validate; remote data flows through here and a
/// malformed address should surface as a decode error at the point where
/// the key is actually needed, not as a panic in a constructor.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Encode a 256-bit public key as a `nano_` address (pad bits, base32
    /// key, byte-reversed checksum) — the inverse of [`Self::public_key`].
    pub fn from_public_key(key: &[u8; 32]) -> Self {
        // 260-bit stream: 4 zero pad bits, then the key, 5 bits per digit.
        let key_bit = |i: usize| -> u8 {
            if i < 4 {
                0
            } else {
                let idx = i - 4;
                (key[idx / 8] >> (7 - (idx % 8))) & 1
            }
        };
        let mut out = String::with_capacity(5 + ADDRESS_KEY_CHARS + ADDRESS_CHECKSUM_CHARS);
        out.push_str("nano_");
        for digit in 0..ADDRESS_KEY_CHARS {
            let mut v = 0u8;
            for bit in 0..5 {
                v = (v << 1) | key_bit(digit * 5 + bit);
            }
            out.push(ALPHABET[v as usize] as char);
        }

        let mut check = checksum(key);
        check.reverse();
        let check_bit = |i: usize| -> u8 { (check[i / 8] >> (7 - (i % 8))) & 1 };
        for digit in 0..ADDRESS_CHECKSUM_CHARS {
            let mut v = 0u8;
            for bit in 0..5 {
                v = (v << 1) | check_bit(digit * 5 + bit);
            }
            out.push(ALPHABET[v as usize] as char);
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address decodes and its checksum verifies.
    pub fn is_valid(&self) -> bool {
        self.public_key().is_ok()
    }

    /// Decode the 256-bit public key encoded in this address, verifying the
    /// trailing checksum.
    pub fn public_key(&self) -> Result<[u8; 32], DecodeError> {
        let invalid = || DecodeError::InvalidAddress(self.0.clone());

        let (_, encoded) = self.0.split_once('_').ok_or_else(invalid)?;
        if encoded.len() != ADDRESS_KEY_CHARS + ADDRESS_CHECKSUM_CHARS {
            return Err(invalid());
        }
        let (key_part, check_part) = encoded.split_at(ADDRESS_KEY_CHARS);

        // 52 base32 digits form a 260-bit big-endian number; the public key
        // is the low 256 bits and the 4 pad bits above them must be zero.
        let mut num = [0u8; 33];
        for c in key_part.bytes() {
            let mut carry = digit(c).ok_or_else(invalid)? as u16;
            for byte in num.iter_mut().rev() {
                let t = (*byte as u16) * 32 + carry;
                *byte = (t & 0xFF) as u8;
                carry = t >> 8;
            }
            if carry != 0 {
                return Err(invalid());
            }
        }
        if num[0] != 0 {
            return Err(invalid());
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&num[1..]);

        // 8 base32 digits = exactly 40 checksum bits.
        let mut check: u64 = 0;
        for c in check_part.bytes() {
            check = (check << 5) | digit(c).ok_or_else(invalid)? as u64;
        }
        let mut expected = checksum(&key);
        expected.reverse();
        let encoded_check = &check.to_be_bytes()[3..];
        if encoded_check != expected {
            return Err(invalid());
        }

        Ok(key)
    }

    /// Uppercase hex form of the public key, as stored in the account table.
    pub fn public_key_hex(&self) -> Result<String, DecodeError> {
        let key = self.public_key()?;
        let mut out = String::with_capacity(64);
        for b in &key {
            out.push_str(&format!("{:02X}", b));
        }
        Ok(out)
    }
}

fn checksum(key: &[u8; 32]) -> [u8; 5] {
    let mut hasher = Blake2bVar::new(5).expect("5 is a valid Blake2b digest size");
    hasher.update(key);
    let mut out = [0u8; 5];
    hasher
        .finalize_variable(&mut out)
        .expect("digest length matches the declared output size");
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
