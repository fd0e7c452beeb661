//! Staleness scanner — self-healing for accounts the realtime feed missed.
//!
//! Sweeps the remote ledger restricted to accounts modified since a rolling
//! watermark, comparing each one's remote block count against what is
//! stored locally. Accounts found behind are handed to the serialized
//! update queue. When a sweep reaches the end of the paginated list the
//! cursor resets and the watermark advances to the sweep's start time minus
//! a safety overlap, tolerating clock skew and late-arriving modifications.

use std::sync::Arc;

use tracing::{debug, info, warn};

use lattice_rpc::RpcClient;
use lattice_store::BlockStore;
use lattice_types::{Address, RawAmount, Timestamp};

use crate::update_queue::{CatchUpJob, UpdateQueue};
use crate::{Shutdown, SyncConfig, SyncError, SyncMetrics};

pub struct StalenessScanner {
    rpc: Arc<RpcClient>,
    blocks: Arc<dyn BlockStore + Send + Sync>,
    queue: UpdateQueue,
    metrics: Arc<SyncMetrics>,
    start_account: Address,
    batch_size: u64,
    threshold: RawAmount,
    interval: std::time::Duration,
    saturation_backoff: std::time::Duration,
    overlap_secs: u64,
    initial_window_secs: u64,
    queue_saturation_limit: usize,
}

struct PageOutcome {
    returned: u64,
    last: Option<Address>,
}

impl StalenessScanner {
    pub fn new(
        config: &SyncConfig,
        rpc: Arc<RpcClient>,
        blocks: Arc<dyn BlockStore + Send + Sync>,
        queue: UpdateQueue,
        metrics: Arc<SyncMetrics>,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            rpc,
            blocks,
            queue,
            metrics,
            start_account: config.sweep_start(),
            batch_size: config.scan_batch_size,
            threshold: config.scan_threshold()?,
            interval: config.scan_interval(),
            saturation_backoff: config.scan_saturation_backoff(),
            overlap_secs: config.scan_overlap_secs,
            initial_window_secs: config.initial_scan_window_secs,
            queue_saturation_limit: config.queue_saturation_limit,
        })
    }

    /// Sweep forever until shutdown.
    pub async fn run(&self, shutdown: Shutdown) {
        let mut rx = shutdown.subscribe();
        let mut cursor = self.start_account.clone();
        let mut watermark = Timestamp::now().saturating_sub_secs(self.initial_window_secs);
        let mut sweep_started = Timestamp::now();

        loop {
            if self.queue.depth() > self.queue_saturation_limit {
                debug!(depth = self.queue.depth(), "update queue saturated, backing off");
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = tokio::time::sleep(self.saturation_backoff) => {}
                }
                continue;
            }

            match self.scan_page(&cursor, watermark).await {
                Ok(page) => {
                    if page.returned < self.batch_size {
                        debug!("scan sweep complete, resetting cursor");
                        cursor = self.start_account.clone();
                        watermark = sweep_started.saturating_sub_secs(self.overlap_secs);
                        sweep_started = Timestamp::now();
                    } else if let Some(last) = page.last {
                        cursor = last;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "staleness scan page failed");
                }
            }

            tokio::select! {
                _ = rx.recv() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        debug!("staleness scanner stopped");
    }

    /// Fetch one ledger page and enqueue every account found behind.
    async fn scan_page(
        &self,
        cursor: &Address,
        watermark: Timestamp,
    ) -> Result<PageOutcome, SyncError> {
        debug!(cursor = %cursor, watermark = %watermark, "scanning for stale accounts");
        let page = self
            .rpc
            .ledger(cursor, self.batch_size, &self.threshold, Some(watermark))
            .await?;

        let mut stale = 0u64;
        for (address, dto) in &page {
            let account = Address::from(address.as_str());
            let record = match dto.to_record(&account) {
                Ok(record) => record,
                Err(e) => {
                    warn!(%account, error = %e, "undecodable ledger entry");
                    continue;
                }
            };
            let local = self.blocks.count_for_account(&account)?;
            if local < record.block_count {
                debug!(
                    %account,
                    local,
                    remote = record.block_count,
                    "account is behind, queueing catch-up"
                );
                stale += 1;
                self.queue.enqueue(CatchUpJob {
                    account,
                    info: record,
                });
            }
        }

        if stale > 0 {
            info!(stale, scanned = page.len(), "queued stale accounts");
            self.metrics.stale_accounts_found.inc_by(stale);
            self.metrics
                .update_queue_depth
                .set(self.queue.depth() as i64);
        }

        Ok(PageOutcome {
            returned: page.len() as u64,
            last: page
                .keys()
                .next_back()
                .map(|address| Address::from(address.as_str())),
        })
    }
}
