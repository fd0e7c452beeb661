//! Realtime confirmation listener behavior against the mock node.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{hash_hex, test_address, MockNode};
use lattice_rpc::RpcClient;
use lattice_store::{AccountStore, BlockStore, ElectionInfo};
use lattice_store_lmdb::{LmdbAccountStore, LmdbBlockStore, LmdbEnvironment};
use lattice_sync::{ConfirmationListener, Shutdown, SyncConfig, SyncMetrics};
use lattice_types::{Address, BlockHash, RawAmount, Timestamp};

struct Harness {
    _dir: tempfile::TempDir,
    blocks: Arc<LmdbBlockStore>,
    accounts: Arc<LmdbAccountStore>,
    listener: Arc<ConfirmationListener>,
}

async fn harness(node: &Arc<MockNode>) -> Harness {
    let (rpc_url, ws_url) = node.spawn().await;
    let mut config = SyncConfig::default();
    config.rpc_url = rpc_url;
    config.websocket_url = ws_url;
    config.rpc_max_retries = 0;
    config.rpc_retry_base_secs = 0;
    config.include_election_info = true;
    // Keep the periodic flushes out of the way; tests flush explicitly and
    // the final drain covers the end-to-end path.
    config.block_flush_interval_secs = 3600;
    config.account_flush_interval_secs = 3600;

    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env");
    let blocks = Arc::new(env.block_store());
    let accounts = Arc::new(env.account_store());
    let listener = ConfirmationListener::new(
        &config,
        Arc::new(RpcClient::new(config.rpc_config())),
        blocks.clone(),
        accounts.clone(),
        Arc::new(SyncMetrics::new()),
    );
    Harness {
        _dir: dir,
        blocks,
        accounts,
        listener,
    }
}

fn confirmation_json(address: &str, hash: &str, with_election: bool) -> String {
    let mut message = serde_json::json!({
        "topic": "confirmation",
        "time": "1700000000000",
        "message": {
            "account": address,
            "hash": hash,
            "amount": "1",
        }
    });
    if with_election {
        message["message"]["election_info"] = serde_json::json!({
            "duration": "350",
            "time": "1700000000000",
            "tally": "42",
            "request_count": "2",
            "blocks": "1",
            "voters": "117",
        });
    }
    message.to_string()
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn buffered_confirmation_flushes_with_election_info() {
    let node = MockNode::new();
    let a = test_address(1);
    node.add_account(&a, 1, 1, 1_700_000_000);

    let h = harness(&node).await;
    h.listener.ingest(&confirmation_json(&a, &hash_hex(1, 1), true));
    assert_eq!(h.listener.pending_len(), (1, 1));

    let saved = h.listener.flush_blocks_once().await.expect("flush");
    assert_eq!(saved, 1);
    assert_eq!(h.listener.pending_len().0, 0);

    let hash = BlockHash::from_hex(&hash_hex(1, 1)).unwrap();
    let stored = h.blocks.get_block(&hash).unwrap().expect("block stored");
    assert!(stored.confirmed);
    assert_eq!(stored.local_timestamp, Timestamp::new(901));
    assert_eq!(
        stored.election,
        Some(ElectionInfo {
            duration: 350,
            time: 1_700_000_000_000,
            tally: RawAmount::new(42),
            request_count: 2,
            blocks: 1,
            voters: 117,
        })
    );

    // Nothing pending: the next flush is a no-op.
    assert_eq!(h.listener.flush_blocks_once().await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_events_collapse_to_one_row() {
    let node = MockNode::new();
    let a = test_address(1);
    node.add_account(&a, 1, 1, 1_700_000_000);

    let h = harness(&node).await;
    h.listener.ingest(&confirmation_json(&a, &hash_hex(1, 1), false));
    h.listener.ingest(&confirmation_json(&a, &hash_hex(1, 1), true));
    assert_eq!(h.listener.pending_len(), (2, 1));

    assert_eq!(h.listener.flush_blocks_once().await.unwrap(), 1);
    assert_eq!(h.blocks.block_count().unwrap(), 1);
    // The later event's election metadata was kept.
    let hash = BlockHash::from_hex(&hash_hex(1, 1)).unwrap();
    assert!(h.blocks.get_block(&hash).unwrap().unwrap().election.is_some());
}

#[tokio::test]
async fn failed_block_flush_requeues_entries() {
    let node = MockNode::new();
    let a = test_address(1);
    node.add_account(&a, 1, 1, 1_700_000_000);
    node.fail_blocks_info.store(true, Ordering::SeqCst);

    let h = harness(&node).await;
    h.listener.ingest(&confirmation_json(&a, &hash_hex(1, 1), false));

    assert!(h.listener.flush_blocks_once().await.is_err());
    assert_eq!(h.listener.pending_len().0, 1, "entry must be re-queued");

    node.fail_blocks_info.store(false, Ordering::SeqCst);
    assert_eq!(h.listener.flush_blocks_once().await.unwrap(), 1);
    assert_eq!(h.blocks.block_count().unwrap(), 1);
}

#[tokio::test]
async fn dirty_accounts_flush_through_account_info() {
    let node = MockNode::new();
    let a = test_address(1);
    node.add_account(&a, 1, 1, 1_700_000_000);

    let h = harness(&node).await;
    h.listener.ingest(&confirmation_json(&a, &hash_hex(1, 1), false));

    let saved = h.listener.flush_accounts_once().await.expect("flush");
    assert_eq!(saved, 1);
    assert_eq!(h.listener.pending_len().1, 0);

    let stored = h
        .accounts
        .get_account(&Address::from(a.as_str()))
        .unwrap()
        .expect("account stored");
    assert_eq!(stored.block_count, 1);
}

#[tokio::test]
async fn unknown_account_event_is_dropped_on_flush() {
    let node = MockNode::new();
    let a = test_address(1);
    node.add_account(&a, 1, 1, 1_700_000_000);

    let h = harness(&node).await;
    // A confirmation for an account the node no longer reports.
    h.listener
        .ingest(&confirmation_json(&test_address(9), &hash_hex(9, 1), false));

    assert_eq!(h.listener.flush_accounts_once().await.unwrap(), 0);
    assert_eq!(h.listener.pending_len().1, 0);
}

#[tokio::test]
async fn non_confirmation_messages_are_ignored() {
    let node = MockNode::new();
    let h = harness(&node).await;

    h.listener.ingest(r#"{"topic":"vote","message":{"account":"x","hash":"y"}}"#);
    h.listener.ingest("not json at all");
    h.listener.ingest(r#"{"ack":"subscribe"}"#);

    assert_eq!(h.listener.pending_len(), (0, 0));
}

#[tokio::test]
async fn feed_events_survive_shutdown_via_final_drain() {
    let node = MockNode::new();
    let a = test_address(1);
    node.add_account(&a, 1, 1, 1_700_000_000);

    let h = harness(&node).await;
    let shutdown = Shutdown::new();
    let run = tokio::spawn(h.listener.clone().run(shutdown.clone()));

    wait_until("feed subscription", || {
        node.ws_subscribers.load(Ordering::SeqCst) > 0
    })
    .await;
    node.push_confirmation(&a, &hash_hex(1, 1), None);
    {
        let listener = h.listener.clone();
        wait_until("event buffered", move || listener.pending_len().0 > 0).await;
    }

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("listener should stop")
        .expect("listener task");

    // The final drain persisted the buffered confirmation.
    let hash = BlockHash::from_hex(&hash_hex(1, 1)).unwrap();
    assert!(h.blocks.get_block(&hash).unwrap().is_some());
    assert!(h
        .accounts
        .get_account(&Address::from(a.as_str()))
        .unwrap()
        .is_some());
}
