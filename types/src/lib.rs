//! Fundamental types for the lattice ledger mirror.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: addresses, block hashes, raw amounts, timestamps, block
//! type/subtype enums, and the protocol constants of the mirrored network.

pub mod address;
pub mod amount;
pub mod block;
pub mod constants;
pub mod error;
pub mod hash;
pub mod time;

pub use address::Address;
pub use amount::RawAmount;
pub use block::{counterparty_account, BlockSubtype, BlockType, CounterpartyFields};
pub use constants::BURN_ADDRESS;
pub use error::DecodeError;
pub use hash::BlockHash;
pub use time::Timestamp;
