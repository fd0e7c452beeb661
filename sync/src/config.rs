//! Sync engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use lattice_rpc::RpcConfig;
use lattice_types::{Address, RawAmount, BURN_ADDRESS};

use crate::SyncError;

/// Configuration for the ledger mirror.
///
/// Can be loaded from a TOML file via [`SyncConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The remote node's RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// The remote node's WebSocket endpoint.
    #[serde(default = "default_websocket_url")]
    pub websocket_url: String,

    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Per-request RPC timeout in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// First RPC retry delay in seconds; doubles per attempt.
    #[serde(default = "default_rpc_retry_base_secs")]
    pub rpc_retry_base_secs: u64,

    /// RPC retries after the initial attempt.
    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u32,

    /// Chain page size when walking an account backward.
    #[serde(default = "default_blocks_batch_size")]
    pub blocks_batch_size: u64,

    /// Page size for the backfill walker's ledger sweep.
    #[serde(default = "default_accounts_batch_size")]
    pub accounts_batch_size: u64,

    /// Page size for the staleness scanner's ledger sweep.
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: u64,

    /// Minimum balance (raw, decimal string) for the scanner's ledger pages.
    #[serde(default = "default_scan_threshold")]
    pub scan_threshold: String,

    /// Consecutive per-account failures before the account is abandoned for
    /// the current pass.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Pause after a failed chain page before the next attempt, ms.
    #[serde(default = "default_failure_pause_ms")]
    pub failure_pause_ms: u64,

    /// Optional pause between chain pages, ms (throttles bulk backfill).
    #[serde(default)]
    pub page_delay_ms: u64,

    /// Realtime block flush cadence, seconds.
    #[serde(default = "default_block_flush_interval_secs")]
    pub block_flush_interval_secs: u64,

    /// Realtime account flush cadence, seconds.
    #[serde(default = "default_account_flush_interval_secs")]
    pub account_flush_interval_secs: u64,

    /// Whether to request election metadata on the confirmation feed.
    #[serde(default)]
    pub include_election_info: bool,

    /// Minimum WebSocket reconnect delay, ms.
    #[serde(default = "default_ws_reconnect_min_ms")]
    pub ws_reconnect_min_ms: u64,

    /// Maximum WebSocket reconnect delay, ms.
    #[serde(default = "default_ws_reconnect_max_ms")]
    pub ws_reconnect_max_ms: u64,

    /// Staleness scanner cadence, seconds.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Scanner backoff when the update queue is saturated, seconds.
    #[serde(default = "default_scan_saturation_backoff_secs")]
    pub scan_saturation_backoff_secs: u64,

    /// Overlap subtracted from the scanner watermark on each sweep, seconds.
    #[serde(default = "default_scan_overlap_secs")]
    pub scan_overlap_secs: u64,

    /// Window behind "now" for the scanner's very first sweep, seconds.
    #[serde(default = "default_initial_scan_window_secs")]
    pub initial_scan_window_secs: u64,

    /// Update-queue depth above which the scanner pauses enqueuing.
    #[serde(default = "default_queue_saturation_limit")]
    pub queue_saturation_limit: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    "http://[::1]:7076".to_string()
}

fn default_websocket_url() -> String {
    "ws://[::1]:7078".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./lattice_data")
}

fn default_map_size() -> usize {
    64 * 1024 * 1024 * 1024
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_rpc_retry_base_secs() -> u64 {
    5
}

fn default_rpc_max_retries() -> u32 {
    5
}

fn default_blocks_batch_size() -> u64 {
    1000
}

fn default_accounts_batch_size() -> u64 {
    5000
}

fn default_scan_batch_size() -> u64 {
    200
}

fn default_scan_threshold() -> String {
    // The scanner only heals accounts above this balance; dust accounts are
    // picked up by the full backfill sweeps instead.
    "100000000000000000".to_string()
}

fn default_max_consecutive_failures() -> u32 {
    6
}

fn default_failure_pause_ms() -> u64 {
    1000
}

fn default_block_flush_interval_secs() -> u64 {
    20
}

fn default_account_flush_interval_secs() -> u64 {
    60
}

fn default_ws_reconnect_min_ms() -> u64 {
    10
}

fn default_ws_reconnect_max_ms() -> u64 {
    2000
}

fn default_scan_interval_secs() -> u64 {
    5
}

fn default_scan_saturation_backoff_secs() -> u64 {
    20
}

fn default_scan_overlap_secs() -> u64 {
    900
}

fn default_initial_scan_window_secs() -> u64 {
    6 * 60 * 60
}

fn default_queue_saturation_limit() -> usize {
    1000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SyncConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, SyncError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SyncError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SyncError> {
        toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("SyncConfig is always serializable to TOML")
    }

    /// RPC client policy derived from this configuration.
    pub fn rpc_config(&self) -> RpcConfig {
        let mut rpc = RpcConfig::new(self.rpc_url.clone());
        rpc.timeout = Duration::from_secs(self.rpc_timeout_secs);
        rpc.retry_base_delay = Duration::from_secs(self.rpc_retry_base_secs);
        rpc.max_retries = self.rpc_max_retries;
        rpc
    }

    /// The scanner's balance threshold, parsed.
    pub fn scan_threshold(&self) -> Result<RawAmount, SyncError> {
        self.scan_threshold
            .parse()
            .map_err(|_| SyncError::Config(format!("bad scan_threshold: {:?}", self.scan_threshold)))
    }

    /// The lowest address, where full-ledger sweeps start.
    pub fn sweep_start(&self) -> Address {
        Address::from(BURN_ADDRESS)
    }

    pub fn failure_pause(&self) -> Duration {
        Duration::from_millis(self.failure_pause_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn block_flush_interval(&self) -> Duration {
        Duration::from_secs(self.block_flush_interval_secs)
    }

    pub fn account_flush_interval(&self) -> Duration {
        Duration::from_secs(self.account_flush_interval_secs)
    }

    pub fn ws_reconnect_min(&self) -> Duration {
        Duration::from_millis(self.ws_reconnect_min_ms)
    }

    pub fn ws_reconnect_max(&self) -> Duration {
        Duration::from_millis(self.ws_reconnect_max_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn scan_saturation_backoff(&self) -> Duration {
        Duration::from_secs(self.scan_saturation_backoff_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            websocket_url: default_websocket_url(),
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            rpc_retry_base_secs: default_rpc_retry_base_secs(),
            rpc_max_retries: default_rpc_max_retries(),
            blocks_batch_size: default_blocks_batch_size(),
            accounts_batch_size: default_accounts_batch_size(),
            scan_batch_size: default_scan_batch_size(),
            scan_threshold: default_scan_threshold(),
            max_consecutive_failures: default_max_consecutive_failures(),
            failure_pause_ms: default_failure_pause_ms(),
            page_delay_ms: 0,
            block_flush_interval_secs: default_block_flush_interval_secs(),
            account_flush_interval_secs: default_account_flush_interval_secs(),
            include_election_info: false,
            ws_reconnect_min_ms: default_ws_reconnect_min_ms(),
            ws_reconnect_max_ms: default_ws_reconnect_max_ms(),
            scan_interval_secs: default_scan_interval_secs(),
            scan_saturation_backoff_secs: default_scan_saturation_backoff_secs(),
            scan_overlap_secs: default_scan_overlap_secs(),
            initial_scan_window_secs: default_initial_scan_window_secs(),
            queue_saturation_limit: default_queue_saturation_limit(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
