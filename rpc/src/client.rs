//! The RPC client: one JSON POST per call, bounded timeout, exponential
//! backoff across a bounded number of retries.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::warn;

use lattice_types::{Address, BlockHash, RawAmount, Timestamp};

use crate::wire::{AccountInfoDto, BlocksInfoDto, ChainDto, FrontierCountDto, LedgerDto};
use crate::RpcError;

/// Client-side policy for talking to the node.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// The node's RPC endpoint, e.g. `http://[::1]:7076`.
    pub url: String,
    /// Total wall-clock budget for a single request.
    pub timeout: Duration,
    /// Budget for establishing the connection.
    pub connect_timeout: Duration,
    /// First retry delay; doubled on each subsequent attempt.
    pub retry_base_delay: Duration,
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            retry_base_delay: Duration::from_secs(5),
            max_retries: 5,
        }
    }
}

/// Delay before retry number `attempt` (zero-based): base × 2^attempt.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

pub struct RpcClient {
    http: reqwest::Client,
    config: RpcConfig,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    /// Total number of account frontiers the node knows about.
    pub async fn frontier_count(&self) -> Result<u64, RpcError> {
        let value = self.call(json!({ "action": "frontier_count" })).await?;
        let dto: FrontierCountDto = decode(value)?;
        dto.count
            .parse()
            .map_err(|_| RpcError::Malformed(format!("bad frontier count: {:?}", dto.count)))
    }

    /// One page of the global account ledger, `count` entries starting at
    /// `start` (inclusive), restricted to balances ≥ `threshold` and, when
    /// given, to accounts modified at or after `modified_since`.
    pub async fn ledger(
        &self,
        start: &Address,
        count: u64,
        threshold: &RawAmount,
        modified_since: Option<Timestamp>,
    ) -> Result<BTreeMap<String, AccountInfoDto>, RpcError> {
        let mut body = json!({
            "action": "ledger",
            "pending": true,
            "representative": true,
            "weight": true,
            "account": start.as_str(),
            "threshold": threshold.to_string(),
            "count": count,
        });
        if let Some(since) = modified_since {
            body["modified_since"] = json!(since.as_secs());
        }
        let value = self.call(body).await?;
        let dto: LedgerDto = decode(value)?;
        Ok(dto.accounts)
    }

    /// Metadata for one account. `Ok(None)` when the node reports an
    /// application error for it (unknown/unopened account): nothing to do,
    /// not a failure.
    pub async fn account_info(&self, account: &Address) -> Result<Option<AccountInfoDto>, RpcError> {
        let body = json!({
            "action": "account_info",
            "account": account.as_str(),
            "representative": true,
            "weight": true,
            "pending": true,
            "include_confirmed": true,
        });
        match self.call(body).await {
            Ok(value) => decode(value).map(Some),
            Err(RpcError::Node(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Up to `count` ancestor hashes walking back from `block`, starting
    /// with `block` itself, in descending-height order.
    pub async fn chain(&self, block: &BlockHash, count: u64) -> Result<Vec<BlockHash>, RpcError> {
        let body = json!({
            "action": "chain",
            "block": block.to_hex(),
            "count": count,
        });
        let value = self.call(body).await?;
        let dto: ChainDto = decode(value)?;
        dto.blocks
            .iter()
            .map(|h| {
                BlockHash::from_hex(h)
                    .map_err(|_| RpcError::Malformed(format!("bad chain hash: {h:?}")))
            })
            .collect()
    }

    /// Resolve full block bodies for a batch of hashes. Unknown hashes come
    /// back in `blocks_not_found` rather than failing the call.
    pub async fn blocks_info(&self, hashes: &[BlockHash]) -> Result<BlocksInfoDto, RpcError> {
        let body = json!({
            "action": "blocks_info",
            "include_not_found": true,
            "source": true,
            "json_block": true,
            "hashes": hashes.iter().map(BlockHash::to_hex).collect::<Vec<_>>(),
        });
        let value = self.call(body).await?;
        decode(value)
    }

    /// Issue `body` with retries. Transient transport failures, non-2xx
    /// statuses and undecodable bodies are retried with exponential backoff
    /// up to `max_retries`; node-reported application errors propagate
    /// immediately.
    async fn call(&self, body: Value) -> Result<Value, RpcError> {
        let action = body
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();

        let mut attempt: u32 = 0;
        loop {
            match self.call_once(&body).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        return Err(e);
                    }
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(%action, attempt, ?delay, error = %e, "rpc call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn call_once(&self, body: &Value) -> Result<Value, RpcError> {
        let response = self
            .http
            .post(&self.config.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Transport(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    RpcError::Transport(format!("connection failed: {e}"))
                } else {
                    RpcError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
                .unwrap_or(text);
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: message,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        // The node reports application errors inside a 200 body.
        if let Some(err) = value.get("error").and_then(Value::as_str) {
            return Err(RpcError::Node(err.to_string()));
        }

        Ok(value)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Malformed(e.to_string()))
}
