//! Backfill walker — converges every account's local block set to the
//! remote chain by sweeping the global ledger.
//!
//! The outer loop pages the `ledger` action with an address cursor: the
//! last address of a page starts the next one (the remote treats the start
//! bound as inclusive, so pages overlap by one entry). A page shorter than
//! the requested batch size means the end of the ledger was reached and
//! the sweep stops; the next invocation starts over from the lowest
//! address. Per-account work runs the chain walk from `account_sync`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use lattice_rpc::RpcClient;
use lattice_store::{AccountStore, BlockStore};
use lattice_types::{Address, RawAmount, Timestamp, BURN_ADDRESS};

use crate::account_sync::{sync_account_blocks, TraversalMode, WalkPolicy};
use crate::{SyncConfig, SyncError, SyncMetrics};

/// Options for one backfill invocation, mirroring the sweep's CLI surface.
#[derive(Clone, Debug)]
pub struct BackfillOptions {
    /// Walk each account's chain, not just its metadata row.
    pub include_blocks: bool,
    /// Traverse every chain to height 1 instead of stopping at count
    /// parity. Slower, but re-covers interior gaps.
    pub all_blocks: bool,
    /// Restrict the sweep to accounts modified within this window.
    pub modified_within: Option<Duration>,
    /// Minimum balance filter for the ledger pages.
    pub threshold: RawAmount,
    /// Resume the sweep from this address instead of the lowest one.
    pub start_account: Address,
    /// Skip the first address of every page; it duplicates the previous
    /// page's last entry.
    pub skip_page_head: bool,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            include_blocks: false,
            all_blocks: false,
            modified_within: None,
            threshold: RawAmount::ZERO,
            start_account: Address::from(BURN_ADDRESS),
            skip_page_head: false,
        }
    }
}

/// Counters describing a finished sweep.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackfillSummary {
    /// Ledger pages fetched.
    pub pages: u64,
    /// Account entries returned across all pages.
    pub accounts_seen: u64,
    /// Accounts whose chain walk ran to completion.
    pub accounts_synced: u64,
    /// Accounts skipped (unknown to the node, undecodable, or their
    /// `account_info` kept failing).
    pub accounts_skipped: u64,
    /// Accounts abandoned mid-walk at the failure ceiling.
    pub accounts_abandoned: u64,
    /// Blocks written through the upsert.
    pub blocks_written: u64,
}

pub struct BackfillWalker {
    rpc: Arc<RpcClient>,
    blocks: Arc<dyn BlockStore + Send + Sync>,
    accounts: Arc<dyn AccountStore + Send + Sync>,
    metrics: Arc<SyncMetrics>,
    policy: WalkPolicy,
    accounts_batch_size: u64,
}

impl BackfillWalker {
    pub fn new(
        config: &SyncConfig,
        rpc: Arc<RpcClient>,
        blocks: Arc<dyn BlockStore + Send + Sync>,
        accounts: Arc<dyn AccountStore + Send + Sync>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            rpc,
            blocks,
            accounts,
            metrics,
            policy: WalkPolicy::from_config(config),
            accounts_batch_size: config.accounts_batch_size,
        }
    }

    /// Run one full sweep. A failing ledger page aborts the sweep (the RPC
    /// client has already retried it); failures inside a single account
    /// never do.
    pub async fn run(&self, options: &BackfillOptions) -> Result<BackfillSummary, SyncError> {
        match self.rpc.frontier_count().await {
            Ok(count) => info!(frontiers = count, "starting backfill sweep"),
            Err(e) => warn!(error = %e, "could not read frontier count"),
        }

        let modified_since = options
            .modified_within
            .map(|window| Timestamp::now().saturating_sub_secs(window.as_secs()));

        let mut summary = BackfillSummary::default();
        let mut cursor = options.start_account.clone();

        loop {
            info!(cursor = %cursor, batch = self.accounts_batch_size, "fetching ledger page");
            let page = self
                .rpc
                .ledger(
                    &cursor,
                    self.accounts_batch_size,
                    &options.threshold,
                    modified_since,
                )
                .await?;
            let returned = page.len() as u64;
            summary.pages += 1;
            summary.accounts_seen += returned;

            let mut records = Vec::with_capacity(page.len());
            for (address, dto) in &page {
                let account = Address::from(address.as_str());
                match dto.to_record(&account) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(%account, error = %e, "undecodable ledger entry"),
                }
            }
            if !records.is_empty() {
                self.accounts.upsert_accounts(&records)?;
                self.metrics.accounts_saved.inc_by(records.len() as u64);
            }

            if options.include_blocks {
                for (i, address) in page.keys().enumerate() {
                    if options.skip_page_head && i == 0 {
                        continue;
                    }
                    let account = Address::from(address.as_str());
                    self.sync_one(&account, options.all_blocks, &mut summary).await;
                }
            }

            if let Some(last) = page.keys().next_back() {
                cursor = Address::from(last.as_str());
            }
            if returned < self.accounts_batch_size {
                break;
            }
        }

        info!(
            pages = summary.pages,
            accounts = summary.accounts_seen,
            blocks = summary.blocks_written,
            abandoned = summary.accounts_abandoned,
            "backfill sweep finished"
        );
        Ok(summary)
    }

    /// Refresh one account's metadata and, when it is behind, its chain.
    /// Every failure path lands in the summary instead of propagating.
    async fn sync_one(&self, account: &Address, all_blocks: bool, summary: &mut BackfillSummary) {
        let info = match self.rpc.account_info(account).await {
            Ok(Some(dto)) => dto,
            Ok(None) => {
                // The node does not know this account (unopened or pruned);
                // nothing to walk.
                summary.accounts_skipped += 1;
                return;
            }
            Err(e) => {
                warn!(%account, error = %e, "account_info failed, skipping for this pass");
                summary.accounts_skipped += 1;
                return;
            }
        };

        let record = match info.to_record(account) {
            Ok(record) => record,
            Err(e) => {
                warn!(%account, error = %e, "undecodable account_info");
                summary.accounts_skipped += 1;
                return;
            }
        };
        if let Err(e) = self.accounts.upsert_accounts(std::slice::from_ref(&record)) {
            warn!(%account, error = %e, "failed to save account");
            summary.accounts_skipped += 1;
            return;
        }
        self.metrics.accounts_saved.inc();

        let mode = if all_blocks {
            TraversalMode::FullChain
        } else {
            TraversalMode::UntilCountParity
        };
        match sync_account_blocks(
            &self.rpc,
            self.blocks.as_ref(),
            &self.metrics,
            account,
            &record,
            mode,
            &self.policy,
        )
        .await
        {
            Ok(outcome) => {
                summary.accounts_synced += 1;
                summary.blocks_written += outcome.written;
                if outcome.abandoned {
                    summary.accounts_abandoned += 1;
                }
            }
            Err(e) => {
                warn!(%account, error = %e, "chain walk failed");
                summary.accounts_abandoned += 1;
            }
        }
    }
}
