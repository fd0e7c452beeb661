//! Property tests for the wire-facing codecs.

use lattice_types::{Address, BlockHash, RawAmount};
use proptest::prelude::*;

proptest! {
    #[test]
    fn address_encode_decode_roundtrip(key in any::<[u8; 32]>()) {
        let addr = Address::from_public_key(&key);
        prop_assert_eq!(addr.public_key().unwrap(), key);
    }

    #[test]
    fn address_order_tracks_key_order(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
        let addr_a = Address::from_public_key(&a);
        let addr_b = Address::from_public_key(&b);
        prop_assert_eq!(addr_a.cmp(&addr_b), a.cmp(&b));
    }

    #[test]
    fn amount_display_parse_roundtrip(raw in any::<u128>()) {
        let amount = RawAmount::new(raw);
        let parsed: RawAmount = amount.to_string().parse().unwrap();
        prop_assert_eq!(parsed, amount);
    }

    #[test]
    fn hash_hex_roundtrip(bytes in any::<[u8; 32]>()) {
        let hash = BlockHash::new(bytes);
        let parsed = BlockHash::from_hex(&hash.to_hex()).unwrap();
        prop_assert_eq!(parsed, hash);
    }

    #[test]
    fn hash_hex_is_uppercase_64(bytes in any::<[u8; 32]>()) {
        let hex = BlockHash::new(bytes).to_hex();
        prop_assert_eq!(hex.len(), 64);
        prop_assert!(hex.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
