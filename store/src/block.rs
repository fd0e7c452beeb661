//! Block record, merge policy, and storage trait.

use serde::{Deserialize, Serialize};

use lattice_types::{Address, BlockHash, BlockSubtype, BlockType, RawAmount, Timestamp};

use crate::StoreError;

/// Election metadata observed on the realtime confirmation feed. The RPC
/// backfill path never sees these values, so once learned they must survive
/// later rewrites of the same row (see [`BlockRecord::merged`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionInfo {
    /// Election duration in milliseconds.
    pub duration: u64,
    /// Election end time, milliseconds since epoch.
    pub time: u64,
    /// Winning tally in raw units.
    pub tally: RawAmount,
    /// Number of confirmation requests broadcast during the election.
    pub request_count: u64,
    /// Number of blocks contested in the election.
    pub blocks: u64,
    /// Number of distinct representatives that voted.
    pub voters: u64,
}

/// One ledger block, keyed by hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: BlockHash,
    /// The account whose chain this block belongs to.
    pub account: Address,
    /// 1-based position in the account's chain; height 1 is the open block.
    pub height: u64,
    /// Hash of the preceding block; the all-zero sentinel at height 1.
    pub previous: BlockHash,
    /// Raw link field: a block hash, a public key, or a legacy destination
    /// address depending on the block operation.
    pub link: Option<String>,
    /// The "other" account this block interacts with, derived from
    /// {type, subtype} via [`lattice_types::counterparty_account`].
    pub counterparty: Option<Address>,
    /// Value moved by this block, when the node reports one.
    pub amount: Option<RawAmount>,
    /// Account balance after this block.
    pub balance: Option<RawAmount>,
    pub block_type: BlockType,
    /// Only meaningful for `state` blocks.
    pub subtype: Option<BlockSubtype>,
    /// When this mirror (or the node feeding it) first observed the block —
    /// not when the block was created.
    pub local_timestamp: Timestamp,
    pub confirmed: bool,
    pub signature: Option<String>,
    pub work: Option<String>,
    pub election: Option<ElectionInfo>,
}

impl BlockRecord {
    /// Resolve a re-insertion of an existing hash.
    ///
    /// `local_timestamp` keeps the minimum: a block backfilled after being
    /// seen live carries the node's older observation time, and the earliest
    /// one is the truthful first sighting. Election metadata is only ever
    /// produced by the realtime feed, so an incoming revision without it
    /// must not erase it. Every other field takes the incoming value — both
    /// writers read the same remote source of truth, so later is never less
    /// correct (this is what lets unconfirmed flip to confirmed but also
    /// re-flip if the node says so).
    pub fn merged(existing: &BlockRecord, incoming: &BlockRecord) -> BlockRecord {
        BlockRecord {
            local_timestamp: existing.local_timestamp.min(incoming.local_timestamp),
            election: incoming
                .election
                .clone()
                .or_else(|| existing.election.clone()),
            ..incoming.clone()
        }
    }
}

/// Trait for block storage.
///
/// `upsert_blocks` must be atomic per row under concurrent writers: the
/// backfill walker and the realtime listener both write here without any
/// ordering between them, and convergence relies on every conflicting write
/// going through [`BlockRecord::merged`] rather than a blind overwrite.
pub trait BlockStore {
    /// Insert-or-merge a batch of blocks in a single atomic write.
    fn upsert_blocks(&self, batch: &[BlockRecord]) -> Result<(), StoreError>;

    /// Fetch a block by hash.
    fn get_block(&self, hash: &BlockHash) -> Result<Option<BlockRecord>, StoreError>;

    /// Fetch the block at a given height of an account's chain.
    fn block_at_height(
        &self,
        account: &Address,
        height: u64,
    ) -> Result<Option<BlockRecord>, StoreError>;

    /// Number of blocks stored for one account. Parity between this and the
    /// remote-reported `block_count` is the sync convergence signal.
    fn count_for_account(&self, account: &Address) -> Result<u64, StoreError>;

    /// Total number of blocks in the store.
    fn block_count(&self) -> Result<u64, StoreError>;
}
