//! LMDB storage backend for the lattice ledger mirror.
//!
//! Implements the `lattice-store` traits using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single
//! environment. LMDB allows exactly one write transaction at a time, so the
//! read-merge-write performed inside `upsert_blocks` is atomic with respect
//! to every other writer — the property the concurrent backfill/realtime
//! writers depend on.

pub mod account;
pub mod block;
pub mod environment;
pub mod error;

pub use account::LmdbAccountStore;
pub use block::LmdbBlockStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
