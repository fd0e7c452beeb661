//! Protocol constants of the mirrored network.

/// The burn address (public key of all zeroes). The `ledger` RPC action
/// treats it as the lowest possible address, so it doubles as the starting
/// cursor for full-ledger pagination sweeps.
pub const BURN_ADDRESS: &str =
    "nano_1111111111111111111111111111111111111111111111111111hifc8npp";

/// Length of the base32-encoded public key portion of an address.
pub const ADDRESS_KEY_CHARS: usize = 52;

/// Length of the base32-encoded checksum portion of an address.
pub const ADDRESS_CHECKSUM_CHARS: usize = 8;
