//! Realtime confirmation listener.
//!
//! Keeps a reconnecting WebSocket subscription to the node's
//! `confirmation` topic and buffers what it hears: block hashes (with any
//! election metadata) into a pending-blocks list, touched accounts into a
//! pending-accounts set. Two flush loops drain the buffers on fixed
//! cadences, resolving bodies over RPC and writing through the same merge
//! upserts the backfill walker uses — which is what makes the two writers
//! commutative.
//!
//! The flush loops are sleep-then-flush, so a slow flush delays the next
//! one instead of overlapping it, and they run independently of the
//! connection state. Buffers grow without bound between flushes; memory is
//! the accepted backpressure, losing entries is not.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use lattice_rpc::RpcClient;
use lattice_store::{AccountStore, BlockStore, ElectionInfo};
use lattice_types::{Address, BlockHash};

use crate::{Shutdown, SyncConfig, SyncError, SyncMetrics};

/// One buffered confirmation: the hash plus any election metadata that
/// rode along with the event (the RPC resolution path cannot recover it).
#[derive(Clone, Debug)]
struct PendingBlock {
    hash: BlockHash,
    election: Option<ElectionInfo>,
}

/// Buffers owned by the listener. Only the listener's own tasks touch
/// them, always through the mutex, never across an await point.
#[derive(Default)]
struct PendingState {
    blocks: Vec<PendingBlock>,
    accounts: HashSet<Address>,
}

/// Envelope of a feed message.
#[derive(Deserialize)]
struct WsEnvelope {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    message: Option<WsConfirmation>,
}

#[derive(Deserialize)]
struct WsConfirmation {
    account: String,
    hash: String,
    #[serde(default)]
    election_info: Option<WsElectionInfo>,
}

#[derive(Deserialize)]
struct WsElectionInfo {
    duration: String,
    time: String,
    tally: String,
    #[serde(default)]
    request_count: Option<String>,
    #[serde(default)]
    blocks: Option<String>,
    #[serde(default)]
    voters: Option<String>,
}

impl WsElectionInfo {
    fn to_record(&self) -> Option<ElectionInfo> {
        Some(ElectionInfo {
            duration: self.duration.parse().ok()?,
            time: self.time.parse().ok()?,
            tally: self.tally.parse().ok()?,
            request_count: self.request_count.as_deref().and_then(|v| v.parse().ok())?,
            blocks: self.blocks.as_deref().and_then(|v| v.parse().ok())?,
            voters: self.voters.as_deref().and_then(|v| v.parse().ok())?,
        })
    }
}

pub struct ConfirmationListener {
    rpc: Arc<RpcClient>,
    blocks: Arc<dyn BlockStore + Send + Sync>,
    accounts: Arc<dyn AccountStore + Send + Sync>,
    metrics: Arc<SyncMetrics>,
    websocket_url: String,
    include_election_info: bool,
    block_flush_interval: Duration,
    account_flush_interval: Duration,
    reconnect_min: Duration,
    reconnect_max: Duration,
    pending: Mutex<PendingState>,
}

impl ConfirmationListener {
    pub fn new(
        config: &SyncConfig,
        rpc: Arc<RpcClient>,
        blocks: Arc<dyn BlockStore + Send + Sync>,
        accounts: Arc<dyn AccountStore + Send + Sync>,
        metrics: Arc<SyncMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rpc,
            blocks,
            accounts,
            metrics,
            websocket_url: config.websocket_url.clone(),
            include_election_info: config.include_election_info,
            block_flush_interval: config.block_flush_interval(),
            account_flush_interval: config.account_flush_interval(),
            reconnect_min: config.ws_reconnect_min(),
            reconnect_max: config.ws_reconnect_max(),
            pending: Mutex::new(PendingState::default()),
        })
    }

    /// Run the subscription and both flush loops until shutdown. The feed
    /// reconnects forever — it is the only realtime signal, so giving up is
    /// never an option. On shutdown, both buffers get one final drain.
    pub async fn run(self: Arc<Self>, shutdown: Shutdown) {
        let block_flush = {
            let listener = self.clone();
            let mut rx = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = rx.recv() => break,
                        _ = tokio::time::sleep(listener.block_flush_interval) => {}
                    }
                    if let Err(e) = listener.flush_blocks_once().await {
                        warn!(error = %e, "block flush failed; entries were re-queued");
                    }
                }
            })
        };
        let account_flush = {
            let listener = self.clone();
            let mut rx = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = rx.recv() => break,
                        _ = tokio::time::sleep(listener.account_flush_interval) => {}
                    }
                    if let Err(e) = listener.flush_accounts_once().await {
                        warn!(error = %e, "account flush failed; entries were re-queued");
                    }
                }
            })
        };

        let mut rx = shutdown.subscribe();
        let mut delay = self.reconnect_min;
        loop {
            tokio::select! {
                _ = rx.recv() => break,
                result = self.connect_and_listen() => {
                    match result {
                        Ok(()) => {
                            info!("confirmation feed closed");
                            delay = self.reconnect_min;
                        }
                        Err(e) => warn!(error = %e, "confirmation feed error"),
                    }
                }
            }
            tokio::select! {
                _ = rx.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = (delay * 2).min(self.reconnect_max);
            self.metrics.feed_reconnects.inc();
        }

        let _ = tokio::join!(block_flush, account_flush);

        // Final drain so buffered confirmations survive a restart.
        if let Err(e) = self.flush_blocks_once().await {
            warn!(error = %e, "final block flush failed");
        }
        if let Err(e) = self.flush_accounts_once().await {
            warn!(error = %e, "final account flush failed");
        }
    }

    /// One connection lifetime: subscribe, then buffer events until the
    /// socket closes or errors.
    async fn connect_and_listen(&self) -> Result<(), SyncError> {
        let (stream, _) = connect_async(self.websocket_url.as_str())
            .await
            .map_err(|e| SyncError::Websocket(e.to_string()))?;
        info!(url = %self.websocket_url, "connected to confirmation feed");

        let (mut write, mut read) = stream.split();
        let subscribe = if self.include_election_info {
            json!({
                "action": "subscribe",
                "topic": "confirmation",
                "options": { "include_election_info": "true" },
            })
        } else {
            json!({ "action": "subscribe", "topic": "confirmation" })
        };
        write
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|e| SyncError::Websocket(e.to_string()))?;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => self.ingest(&text),
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(SyncError::Websocket(e.to_string())),
            }
        }
        Ok(())
    }

    /// Buffer one raw feed message. Non-confirmation topics and messages
    /// that do not parse are dropped — the staleness scanner will pick up
    /// whatever a dropped event would have told us.
    pub fn ingest(&self, text: &str) {
        let envelope: WsEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "unparseable feed message");
                return;
            }
        };
        if envelope.topic.as_deref() != Some("confirmation") {
            return;
        }
        let Some(message) = envelope.message else {
            return;
        };
        let hash = match BlockHash::from_hex(&message.hash) {
            Ok(hash) => hash,
            Err(_) => {
                debug!(hash = %message.hash, "bad hash on feed");
                return;
            }
        };

        debug!(%hash, account = %message.account, "received confirmation");
        let election = message.election_info.as_ref().and_then(WsElectionInfo::to_record);
        let mut pending = self.pending.lock().expect("pending mutex poisoned");
        pending.blocks.push(PendingBlock { hash, election });
        pending.accounts.insert(Address::from(message.account));
        self.metrics.confirmations_received.inc();
    }

    /// Snapshot and clear the pending-blocks buffer, resolve the bodies,
    /// and upsert them. On failure the snapshot is pushed back so nothing
    /// is lost; the next cycle retries.
    pub async fn flush_blocks_once(&self) -> Result<usize, SyncError> {
        let drained: Vec<PendingBlock> = {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            std::mem::take(&mut pending.blocks)
        };
        if drained.is_empty() {
            return Ok(0);
        }
        debug!(count = drained.len(), "flushing confirmed blocks");

        match self.resolve_and_save(&drained).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                let mut pending = self.pending.lock().expect("pending mutex poisoned");
                pending.blocks.extend(drained);
                Err(e)
            }
        }
    }

    async fn resolve_and_save(&self, drained: &[PendingBlock]) -> Result<usize, SyncError> {
        // Dedupe hashes, keeping the last election payload seen per hash.
        let mut hashes: Vec<BlockHash> = Vec::with_capacity(drained.len());
        let mut seen: HashSet<BlockHash> = HashSet::with_capacity(drained.len());
        for entry in drained {
            if seen.insert(entry.hash) {
                hashes.push(entry.hash);
            }
        }

        let resolved = self.rpc.blocks_info(&hashes).await?;
        let mut records = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            let Some(dto) = resolved.blocks.get(&hash.to_hex()) else {
                debug!(%hash, "confirmed block not found via rpc");
                continue;
            };
            let election = drained
                .iter()
                .rev()
                .find(|entry| entry.hash == *hash)
                .and_then(|entry| entry.election.clone());
            match dto.to_record(hash, election) {
                Ok(record) => records.push(record),
                Err(e) => warn!(%hash, error = %e, "undecodable block body"),
            }
        }

        if records.is_empty() {
            return Ok(0);
        }
        self.blocks.upsert_blocks(&records)?;
        self.metrics.blocks_saved.inc_by(records.len() as u64);
        info!(count = records.len(), "saved confirmed blocks");
        Ok(records.len())
    }

    /// Snapshot and clear the pending-accounts set, refresh each account
    /// over RPC, and upsert the batch. Accounts whose refresh failed
    /// transiently are marked dirty again.
    pub async fn flush_accounts_once(&self) -> Result<usize, SyncError> {
        let drained: Vec<Address> = {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            pending.accounts.drain().collect()
        };
        if drained.is_empty() {
            return Ok(0);
        }
        debug!(count = drained.len(), "refreshing dirty accounts");

        let mut records = Vec::with_capacity(drained.len());
        for account in &drained {
            match self.rpc.account_info(account).await {
                Ok(Some(dto)) => match dto.to_record(account) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(%account, error = %e, "undecodable account_info"),
                },
                Ok(None) => {}
                Err(e) => {
                    warn!(%account, error = %e, "account refresh failed, re-queueing");
                    let mut pending = self.pending.lock().expect("pending mutex poisoned");
                    pending.accounts.insert(account.clone());
                }
            }
        }

        if records.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.accounts.upsert_accounts(&records) {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            for record in &records {
                pending.accounts.insert(record.address.clone());
            }
            return Err(e.into());
        }
        self.metrics.accounts_saved.inc_by(records.len() as u64);
        info!(count = records.len(), "saved refreshed accounts");
        Ok(records.len())
    }

    /// Buffered entries awaiting the next flushes: (blocks, accounts).
    pub fn pending_len(&self) -> (usize, usize) {
        let pending = self.pending.lock().expect("pending mutex poisoned");
        (pending.blocks.len(), pending.accounts.len())
    }
}
