//! Abstract storage traits for the lattice ledger mirror.
//!
//! Every storage backend (LMDB today, anything with atomic upsert-with-merge
//! tomorrow) implements these traits. The sync engine depends only on the
//! traits, and the field-wise merge policy lives here as plain functions so
//! every backend applies the same rules.

pub mod account;
pub mod block;
pub mod error;

pub use account::{AccountRecord, AccountStore};
pub use block::{BlockRecord, BlockStore, ElectionInfo};
pub use error::StoreError;
