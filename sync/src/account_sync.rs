//! Per-account chain catch-up — the routine shared by the backfill walker
//! and the staleness scanner's update queue.
//!
//! Pages backward from the account's frontier in strictly descending-height
//! order: each `chain` page yields ancestor hashes, `blocks_info` resolves
//! their bodies, and the batch goes through the block store's merge upsert.
//! The page cursor is the oldest hash of the previous page, so consecutive
//! pages overlap by one block; the upsert makes the overlap harmless.

use std::time::Duration;

use tracing::{debug, warn};

use lattice_rpc::RpcClient;
use lattice_store::{AccountRecord, BlockRecord, BlockStore};
use lattice_types::Address;

use crate::{SyncConfig, SyncError, SyncMetrics};

/// How a traversal decides it is done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalMode {
    /// Stop when the locally stored block count reaches the remote-reported
    /// `block_count`. Cheap, but cannot see interior gaps left by an
    /// earlier abandoned traversal.
    UntilCountParity,
    /// Walk until a height-1 block has been paged. Re-covers interior gaps
    /// at the cost of re-reading the whole chain.
    FullChain,
}

/// Knobs governing one chain walk.
#[derive(Clone, Debug)]
pub struct WalkPolicy {
    /// Maximum hashes per `chain` page.
    pub batch_size: u64,
    /// Consecutive failures after which the account is abandoned for the
    /// current pass. Reset to zero by any successful batch write.
    pub max_consecutive_failures: u32,
    /// Pause after a failed page before the next attempt.
    pub failure_pause: Duration,
    /// Optional pause between successful pages.
    pub page_delay: Duration,
}

impl WalkPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.blocks_batch_size,
            max_consecutive_failures: config.max_consecutive_failures,
            failure_pause: config.failure_pause(),
            page_delay: config.page_delay(),
        }
    }
}

/// What one chain walk accomplished.
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkOutcome {
    /// Blocks written through the upsert (including re-writes of blocks
    /// already stored).
    pub written: u64,
    /// Chain pages successfully applied.
    pub pages: u64,
    /// Whether the walk hit the consecutive-failure ceiling and gave up.
    /// The account stays behind until a later pass retries it.
    pub abandoned: bool,
}

/// Converge the locally stored blocks of `account` toward the remote chain
/// described by `info`.
///
/// Failures inside the page loop (RPC, decoding, store) count against the
/// consecutive-failure budget instead of propagating, so one bad account
/// can never wedge an outer sweep. Errors reading the local count do
/// propagate: they mean the store itself is unhealthy.
pub async fn sync_account_blocks(
    rpc: &RpcClient,
    blocks: &(dyn BlockStore + Sync),
    metrics: &SyncMetrics,
    account: &Address,
    info: &AccountRecord,
    mode: TraversalMode,
    policy: &WalkPolicy,
) -> Result<WalkOutcome, SyncError> {
    let target = info.block_count;
    let mut cursor = info.frontier;
    let mut oldest_height = target;
    let mut local_count = blocks.count_for_account(account)?;
    let mut failures: u32 = 0;
    let mut outcome = WalkOutcome::default();

    loop {
        let behind = match mode {
            TraversalMode::UntilCountParity => local_count < target,
            TraversalMode::FullChain => oldest_height > 1,
        };
        if !behind || failures >= policy.max_consecutive_failures {
            break;
        }

        debug!(
            %account,
            target,
            local_count,
            cursor = %cursor,
            "requesting chain page"
        );
        let page_size = target.min(policy.batch_size).max(1);

        let hashes = match rpc.chain(&cursor, page_size).await {
            Ok(hashes) if !hashes.is_empty() => hashes,
            Ok(_) => {
                warn!(%account, cursor = %cursor, "empty chain page");
                failures += 1;
                tokio::time::sleep(policy.failure_pause).await;
                continue;
            }
            Err(e) => {
                warn!(%account, error = %e, "chain page failed");
                failures += 1;
                tokio::time::sleep(policy.failure_pause).await;
                continue;
            }
        };
        if let Some(oldest) = hashes.last() {
            cursor = *oldest;
        }

        let resolved = match rpc.blocks_info(&hashes).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(%account, count = hashes.len(), error = %e, "blocks_info failed");
                failures += 1;
                tokio::time::sleep(policy.failure_pause).await;
                continue;
            }
        };
        if !resolved.blocks_not_found.is_empty() {
            debug!(
                %account,
                missing = resolved.blocks_not_found.len(),
                "some chain hashes were not found"
            );
        }

        // Build records in requested-hash order so the last element is the
        // oldest block of the page.
        let mut records: Vec<BlockRecord> = Vec::with_capacity(hashes.len());
        let mut bad_page = false;
        for hash in &hashes {
            let Some(dto) = resolved.blocks.get(&hash.to_hex()) else {
                continue;
            };
            match dto.to_record(hash, None) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%account, %hash, error = %e, "undecodable block body");
                    bad_page = true;
                    break;
                }
            }
        }
        // An empty page cannot advance the count, so treating it as a
        // failure keeps the ceiling as the only exit in count mode.
        if bad_page || records.is_empty() {
            failures += 1;
            tokio::time::sleep(policy.failure_pause).await;
            continue;
        }

        if let Some(oldest) = records.last() {
            oldest_height = oldest.height;
        }

        match blocks.upsert_blocks(&records) {
            Ok(()) => {
                debug!(%account, count = records.len(), "saved blocks");
                failures = 0;
                outcome.written += records.len() as u64;
                outcome.pages += 1;
                metrics.blocks_saved.inc_by(records.len() as u64);
            }
            Err(e) => {
                warn!(%account, error = %e, "failed to save block batch");
                failures += 1;
                tokio::time::sleep(policy.failure_pause).await;
                continue;
            }
        }

        if mode == TraversalMode::UntilCountParity {
            local_count = blocks.count_for_account(account)?;
            // The whole chain has been paged. If the count still falls
            // short (a page was skipped after a failure, or remote and
            // local genuinely disagree) another lap cannot fix it — the
            // next sweep gets a fresh frontier and retries.
            if oldest_height <= 1 && local_count < target {
                warn!(
                    %account,
                    local_count,
                    target,
                    "chain exhausted before count parity"
                );
                break;
            }
        }
        if !policy.page_delay.is_zero() {
            tokio::time::sleep(policy.page_delay).await;
        }
    }

    outcome.abandoned = failures >= policy.max_consecutive_failures;
    if outcome.abandoned {
        warn!(%account, failures, "abandoning account for this pass");
        metrics.accounts_abandoned.inc();
    } else {
        debug!(%account, written = outcome.written, "finished processing blocks");
    }
    Ok(outcome)
}
