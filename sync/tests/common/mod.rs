//! In-process mock of the remote node: the RPC action surface over HTTP
//! POST and the confirmation feed over `/ws`.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use lattice_types::{Address, BlockHash, BURN_ADDRESS};

pub const SOURCE_ACCOUNT: &str =
    "nano_3t6k35gi95xu6tergt6p69ck76ogmitsa8mnijtpxm9fkcm736xtoncuohr3";

/// Checksum-valid address whose public key starts with `seed`, so
/// addresses sort by seed and always above the burn address.
pub fn test_address(seed: u8) -> String {
    let mut key = [0u8; 32];
    key[0] = seed;
    Address::from_public_key(&key).to_string()
}

#[derive(Clone, Debug)]
pub struct MockBlock {
    pub hash: String,
    pub previous: String,
    pub height: u64,
    pub local_timestamp: u64,
}

#[derive(Clone, Debug)]
pub struct MockAccount {
    pub address: String,
    pub chain: Vec<MockBlock>,
    pub modified_timestamp: u64,
    pub balance: String,
}

impl MockAccount {
    fn frontier(&self) -> String {
        self.chain
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| "0".repeat(64))
    }

    fn open_block(&self) -> String {
        self.chain
            .first()
            .map(|b| b.hash.clone())
            .unwrap_or_else(|| "0".repeat(64))
    }
}

pub struct MockNode {
    pub accounts: Mutex<BTreeMap<String, MockAccount>>,
    /// Addresses whose `account_info` always answers 500.
    pub fail_account_info: Mutex<HashSet<String>>,
    /// When set, every `blocks_info` call answers 500.
    pub fail_blocks_info: AtomicBool,
    pub ledger_calls: AtomicU32,
    pub account_info_calls: AtomicU32,
    pub chain_calls: AtomicU32,
    pub blocks_info_calls: AtomicU32,
    pub ws_subscribers: AtomicU32,
    confirmations: broadcast::Sender<String>,
}

/// Deterministic hash for (account seed, height).
pub fn hash_hex(seed: u8, height: u64) -> String {
    let mut bytes = [0u8; 32];
    bytes[0] = seed;
    bytes[24..].copy_from_slice(&height.to_be_bytes());
    BlockHash::new(bytes).to_hex()
}

fn make_chain(seed: u8, len: u64) -> Vec<MockBlock> {
    (1..=len)
        .map(|h| MockBlock {
            hash: hash_hex(seed, h),
            previous: if h == 1 {
                "0".repeat(64)
            } else {
                hash_hex(seed, h - 1)
            },
            height: h,
            local_timestamp: 900 + h,
        })
        .collect()
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        let (confirmations, _) = broadcast::channel(64);
        Arc::new(Self {
            accounts: Mutex::new(BTreeMap::new()),
            fail_account_info: Mutex::new(HashSet::new()),
            fail_blocks_info: AtomicBool::new(false),
            ledger_calls: AtomicU32::new(0),
            account_info_calls: AtomicU32::new(0),
            chain_calls: AtomicU32::new(0),
            blocks_info_calls: AtomicU32::new(0),
            ws_subscribers: AtomicU32::new(0),
            confirmations,
        })
    }

    pub fn add_account(&self, address: &str, seed: u8, blocks: u64, modified: u64) {
        let account = MockAccount {
            address: address.to_string(),
            chain: make_chain(seed, blocks),
            modified_timestamp: modified,
            balance: "1000000000000000000000000".to_string(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(address.to_string(), account);
    }

    /// Append `extra` blocks to an existing account's chain and bump its
    /// modified timestamp.
    pub fn extend_chain(&self, address: &str, extra: u64, modified: u64) {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(address).expect("unknown mock account");
        let seed = BlockHash::from_hex(&account.chain[0].hash).unwrap().as_bytes()[0];
        let from = account.chain.len() as u64;
        for h in from + 1..=from + extra {
            account.chain.push(MockBlock {
                hash: hash_hex(seed, h),
                previous: hash_hex(seed, h - 1),
                height: h,
                local_timestamp: 900 + h,
            });
        }
        account.modified_timestamp = modified;
    }

    /// Broadcast a confirmation event to every connected feed client.
    pub fn push_confirmation(&self, address: &str, hash: &str, election_info: Option<Value>) {
        let mut message = json!({
            "topic": "confirmation",
            "time": "1700000000000",
            "message": {
                "account": address,
                "hash": hash,
                "amount": "1",
            }
        });
        if let Some(info) = election_info {
            message["message"]["election_info"] = info;
        }
        let _ = self.confirmations.send(message.to_string());
    }

    /// Start serving; returns (rpc_url, websocket_url).
    pub async fn spawn(self: &Arc<Self>) -> (String, String) {
        let app = Router::new()
            .route("/", post(rpc_handler))
            .route("/ws", get(ws_handler))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock node");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock node");
        });
        (format!("http://{addr}"), format!("ws://{addr}/ws"))
    }
}

fn ledger_entry(account: &MockAccount) -> Value {
    json!({
        "frontier": account.frontier(),
        "open_block": account.open_block(),
        "representative_block": account.open_block(),
        "balance": account.balance,
        "modified_timestamp": account.modified_timestamp.to_string(),
        "block_count": account.chain.len().to_string(),
        "representative": account.address,
        "weight": "0",
        "pending": "0",
    })
}

fn account_info_entry(account: &MockAccount) -> Value {
    let mut entry = ledger_entry(account);
    entry["confirmation_height"] = json!(account.chain.len().to_string());
    entry["confirmation_height_frontier"] = json!(account.frontier());
    entry
}

fn block_info_entry(account: &MockAccount, block: &MockBlock) -> Value {
    json!({
        "block_account": account.address,
        "amount": "1",
        "balance": block.height.to_string(),
        "height": block.height.to_string(),
        "local_timestamp": block.local_timestamp.to_string(),
        "confirmed": "true",
        "subtype": if block.height == 1 { "open" } else { "receive" },
        "source_account": SOURCE_ACCOUNT,
        "contents": {
            "type": "state",
            "account": account.address,
            "previous": block.previous,
            "representative": account.address,
            "balance": block.height.to_string(),
            "link": "0".repeat(64),
            "link_as_account": BURN_ADDRESS,
            "signature": "SIG",
            "work": "0000000000000000",
        }
    })
}

async fn rpc_handler(
    State(node): State<Arc<MockNode>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let action = body["action"].as_str().unwrap_or("");
    match action {
        "frontier_count" => {
            let count = node.accounts.lock().unwrap().len();
            (StatusCode::OK, Json(json!({ "count": count.to_string() })))
        }
        "ledger" => {
            node.ledger_calls.fetch_add(1, Ordering::SeqCst);
            let start = body["account"].as_str().unwrap_or(BURN_ADDRESS).to_string();
            let count = body["count"].as_u64().unwrap_or(1);
            let modified_since = body["modified_since"].as_u64();

            let accounts = node.accounts.lock().unwrap();
            let mut out = serde_json::Map::new();
            for (address, account) in
                accounts.range::<String, _>((Bound::Included(start), Bound::Unbounded))
            {
                if out.len() as u64 >= count {
                    break;
                }
                if let Some(since) = modified_since {
                    if account.modified_timestamp < since {
                        continue;
                    }
                }
                out.insert(address.clone(), ledger_entry(account));
            }
            (StatusCode::OK, Json(json!({ "accounts": out })))
        }
        "account_info" => {
            node.account_info_calls.fetch_add(1, Ordering::SeqCst);
            let address = body["account"].as_str().unwrap_or("");
            if node.fail_account_info.lock().unwrap().contains(address) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "mock outage" })),
                );
            }
            let accounts = node.accounts.lock().unwrap();
            match accounts.get(address) {
                Some(account) => (StatusCode::OK, Json(account_info_entry(account))),
                None => (StatusCode::OK, Json(json!({ "error": "Account not found" }))),
            }
        }
        "chain" => {
            node.chain_calls.fetch_add(1, Ordering::SeqCst);
            let block = body["block"].as_str().unwrap_or("");
            let count = body["count"].as_u64().unwrap_or(1) as usize;
            let accounts = node.accounts.lock().unwrap();
            for account in accounts.values() {
                if let Some(idx) = account.chain.iter().position(|b| b.hash == block) {
                    let hashes: Vec<String> = account.chain[..=idx]
                        .iter()
                        .rev()
                        .take(count)
                        .map(|b| b.hash.clone())
                        .collect();
                    return (StatusCode::OK, Json(json!({ "blocks": hashes })));
                }
            }
            (StatusCode::OK, Json(json!({ "error": "Block not found" })))
        }
        "blocks_info" => {
            node.blocks_info_calls.fetch_add(1, Ordering::SeqCst);
            if node.fail_blocks_info.load(Ordering::SeqCst) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "mock outage" })),
                );
            }
            let hashes: Vec<String> = body["hashes"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();

            let accounts = node.accounts.lock().unwrap();
            let mut index: HashMap<&str, (&MockAccount, &MockBlock)> = HashMap::new();
            for account in accounts.values() {
                for block in &account.chain {
                    index.insert(block.hash.as_str(), (account, block));
                }
            }

            let mut blocks = serde_json::Map::new();
            let mut not_found = Vec::new();
            for hash in &hashes {
                match index.get(hash.as_str()) {
                    Some((account, block)) => {
                        blocks.insert(hash.clone(), block_info_entry(account, block));
                    }
                    None => not_found.push(hash.clone()),
                }
            }
            (
                StatusCode::OK,
                Json(json!({ "blocks": blocks, "blocks_not_found": not_found })),
            )
        }
        _ => (
            StatusCode::OK,
            Json(json!({ "error": "Unknown command" })),
        ),
    }
}

async fn ws_handler(
    State(node): State<Arc<MockNode>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_ws(socket, node))
}

async fn handle_ws(mut socket: WebSocket, node: Arc<MockNode>) {
    let mut rx = node.confirmations.subscribe();

    // Wait for the client's subscribe message before forwarding anything.
    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Text(text) = message {
            if text.contains("subscribe") {
                break;
            }
        }
    }
    node.ws_subscribers.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(text) => {
                    if socket.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}
