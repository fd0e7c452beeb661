//! Account cursor record and storage trait.

use serde::{Deserialize, Serialize};

use lattice_types::{Address, BlockHash, RawAmount, Timestamp};

use crate::StoreError;

/// Per-account metadata mirrored from the remote node's `account_info` /
/// `ledger` responses. This table is the convergence signal: an account is
/// caught up when `block_count` here equals the number of blocks stored
/// locally for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    /// Uppercase hex public key, derived locally from the address.
    pub key: String,
    /// Hash of the highest block in the account's chain.
    pub frontier: BlockHash,
    /// Hash of the account's first (height 1) block.
    pub open_block: BlockHash,
    /// Hash of the block that last set the representative.
    pub representative_block: BlockHash,
    pub balance: RawAmount,
    /// Last modification time as reported by the remote node.
    pub modified_timestamp: Timestamp,
    /// Remote-reported total number of blocks in the chain. The remote is
    /// append-only per account, so successive reads never decrease this.
    pub block_count: u64,
    /// Height below which the remote considers all blocks confirmed.
    /// Always ≤ `block_count`.
    pub confirmation_height: u64,
    pub confirmation_height_frontier: BlockHash,
    pub representative: Option<Address>,
    pub weight: Option<RawAmount>,
    pub pending: Option<RawAmount>,
}

/// Trait for account cursor storage.
///
/// Account upserts are whole-row last-write-wins: every writer derives its
/// values from the same remote at different times, and the remote's
/// per-account state is append-only, so the latest read is the freshest.
pub trait AccountStore {
    /// Insert-or-replace a batch of accounts in a single atomic write.
    fn upsert_accounts(&self, batch: &[AccountRecord]) -> Result<(), StoreError>;

    /// Fetch an account by address.
    fn get_account(&self, address: &Address) -> Result<Option<AccountRecord>, StoreError>;

    /// Number of accounts stored.
    fn account_count(&self) -> Result<u64, StoreError>;

    /// Page through accounts in address order, strictly after `cursor`
    /// (from the beginning when `None`). This is the read surface the
    /// rollup consumers paginate with.
    fn accounts_after(
        &self,
        cursor: Option<&Address>,
        limit: usize,
    ) -> Result<Vec<AccountRecord>, StoreError>;
}
