//! Serialized per-account catch-up queue.
//!
//! Both the staleness scanner and (indirectly) the realtime path funnel
//! catch-up work through one worker draining an unbounded channel, so at
//! most one chain walk is in flight at any time. That is the serialization
//! discipline the concurrent sweeps rely on; cross-account parallelism is
//! a throughput lever, not a correctness requirement, and is deliberately
//! absent here.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use lattice_rpc::RpcClient;
use lattice_store::{AccountRecord, BlockStore};
use lattice_types::Address;

use crate::account_sync::{sync_account_blocks, TraversalMode, WalkPolicy};
use crate::{Shutdown, SyncMetrics};

/// One unit of catch-up work: an account plus the remote-reported state
/// that showed it behind. Carrying the record avoids refetching
/// `account_info` the worker would otherwise need.
#[derive(Clone, Debug)]
pub struct CatchUpJob {
    pub account: Address,
    pub info: AccountRecord,
}

/// Producer handle. Cloneable; depth is shared with the worker.
#[derive(Clone)]
pub struct UpdateQueue {
    tx: mpsc::UnboundedSender<CatchUpJob>,
    depth: Arc<AtomicUsize>,
}

impl UpdateQueue {
    /// Enqueue a catch-up job. Silently dropped if the worker is gone —
    /// that only happens during shutdown.
    pub fn enqueue(&self, job: CatchUpJob) {
        if self.tx.send(job).is_ok() {
            self.depth.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Jobs enqueued but not yet finished.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Consumer side; drains jobs one at a time.
pub struct UpdateWorker {
    rx: mpsc::UnboundedReceiver<CatchUpJob>,
    depth: Arc<AtomicUsize>,
    rpc: Arc<RpcClient>,
    blocks: Arc<dyn BlockStore + Send + Sync>,
    metrics: Arc<SyncMetrics>,
    policy: WalkPolicy,
}

/// Build a connected queue/worker pair.
pub fn update_queue(
    rpc: Arc<RpcClient>,
    blocks: Arc<dyn BlockStore + Send + Sync>,
    metrics: Arc<SyncMetrics>,
    policy: WalkPolicy,
) -> (UpdateQueue, UpdateWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    let queue = UpdateQueue {
        tx,
        depth: depth.clone(),
    };
    let worker = UpdateWorker {
        rx,
        depth,
        rpc,
        blocks,
        metrics,
        policy,
    };
    (queue, worker)
}

impl UpdateWorker {
    /// Drain jobs until shutdown. In-flight work completes before the loop
    /// exits.
    pub async fn run(mut self, shutdown: Shutdown) {
        let mut rx_shutdown = shutdown.subscribe();
        loop {
            tokio::select! {
                _ = rx_shutdown.recv() => break,
                job = self.rx.recv() => {
                    match job {
                        Some(job) => {
                            self.process(job).await;
                            self.depth.fetch_sub(1, Ordering::SeqCst);
                            self.metrics
                                .update_queue_depth
                                .set(self.depth.load(Ordering::SeqCst) as i64);
                        }
                        None => break,
                    }
                }
            }
        }
        debug!("update worker stopped");
    }

    async fn process(&self, job: CatchUpJob) {
        debug!(account = %job.account, "processing catch-up job");
        match sync_account_blocks(
            &self.rpc,
            self.blocks.as_ref(),
            &self.metrics,
            &job.account,
            &job.info,
            TraversalMode::UntilCountParity,
            &self.policy,
        )
        .await
        {
            Ok(outcome) if outcome.abandoned => {
                warn!(account = %job.account, "catch-up abandoned; a later sweep will retry");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(account = %job.account, error = %e, "catch-up failed");
            }
        }
    }
}
