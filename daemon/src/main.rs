//! Ledger mirror daemon — entry point.
//!
//! Two subcommands cover the two operating modes:
//! - `backfill`: one-shot sweep of the remote ledger over RPC, optionally
//!   walking every account chain.
//! - `listen`: long-running mode following the realtime confirmation feed
//!   with the staleness scanner healing whatever the feed misses.

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use lattice_rpc::RpcClient;
use lattice_store::{AccountStore, BlockStore};
use lattice_store_lmdb::LmdbEnvironment;
use lattice_sync::{
    update_queue, BackfillOptions, BackfillWalker, ConfirmationListener, Shutdown,
    StalenessScanner, SyncConfig, SyncMetrics, WalkPolicy,
};
use lattice_types::Address;

use logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "lattice-daemon", about = "Block-lattice ledger mirror")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override
    /// file settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// The remote node's RPC endpoint.
    #[arg(long, env = "LATTICE_RPC_URL")]
    rpc_url: Option<String>,

    /// The remote node's WebSocket endpoint.
    #[arg(long, env = "LATTICE_WS_URL")]
    websocket_url: Option<String>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "LATTICE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LATTICE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Sweep the remote ledger once over RPC.
    Backfill {
        /// Walk each account's block chain, not just its metadata.
        #[arg(long)]
        blocks: bool,

        /// Traverse every chain down to its open block instead of stopping
        /// at count parity (re-covers interior gaps; much slower).
        #[arg(long)]
        all_blocks: bool,

        /// Only sweep accounts modified within the last N hours.
        #[arg(long)]
        hours: Option<u64>,

        /// Minimum balance (raw) for swept accounts.
        #[arg(long)]
        threshold: Option<String>,

        /// Resume the sweep from this address.
        #[arg(long)]
        account: Option<String>,

        /// Pause between chain pages, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Skip the first address of every page (it duplicates the
        /// previous page's last entry).
        #[arg(long)]
        skip: bool,
    },
    /// Follow the realtime confirmation feed; heal stale accounts.
    Listen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_toml_file(&path.display().to_string())
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(websocket_url) = cli.websocket_url {
        config.websocket_url = websocket_url;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    init_logging(LogFormat::parse(&config.log_format), &config.log_level);

    let env = LmdbEnvironment::open(&config.data_dir, config.map_size)
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    let blocks: Arc<dyn BlockStore + Send + Sync> = Arc::new(env.block_store());
    let accounts: Arc<dyn AccountStore + Send + Sync> = Arc::new(env.account_store());
    let rpc = Arc::new(RpcClient::new(config.rpc_config()));
    let metrics = Arc::new(SyncMetrics::new());

    match cli.command {
        Command::Backfill {
            blocks: include_blocks,
            all_blocks,
            hours,
            threshold,
            account,
            delay_ms,
            skip,
        } => {
            if let Some(delay_ms) = delay_ms {
                config.page_delay_ms = delay_ms;
            }
            let mut options = BackfillOptions {
                include_blocks,
                all_blocks,
                skip_page_head: skip,
                modified_within: hours.map(|h| Duration::from_secs(h * 60 * 60)),
                ..Default::default()
            };
            if let Some(threshold) = threshold {
                options.threshold = threshold
                    .parse()
                    .map_err(|e| anyhow::anyhow!("bad --threshold: {e}"))?;
            }
            if let Some(account) = account {
                options.start_account = Address::from(account);
            }

            let walker = BackfillWalker::new(&config, rpc, blocks, accounts, metrics);
            let summary = walker.run(&options).await?;
            tracing::info!(
                pages = summary.pages,
                accounts = summary.accounts_seen,
                synced = summary.accounts_synced,
                skipped = summary.accounts_skipped,
                abandoned = summary.accounts_abandoned,
                blocks = summary.blocks_written,
                "backfill complete"
            );
        }
        Command::Listen => {
            tracing::info!(
                rpc = %config.rpc_url,
                feed = %config.websocket_url,
                "starting realtime mirror"
            );
            let shutdown = Shutdown::new();

            let (queue, worker) = update_queue(
                rpc.clone(),
                blocks.clone(),
                metrics.clone(),
                WalkPolicy::from_config(&config),
            );
            let scanner = Arc::new(StalenessScanner::new(
                &config,
                rpc.clone(),
                blocks.clone(),
                queue,
                metrics.clone(),
            )?);
            let listener =
                ConfirmationListener::new(&config, rpc, blocks, accounts, metrics.clone());

            let signal = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.wait_for_signal().await })
            };
            let worker_task = tokio::spawn(worker.run(shutdown.clone()));
            let scanner_task = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { scanner.run(shutdown).await })
            };
            let listener_task = tokio::spawn(listener.run(shutdown));

            let _ = tokio::join!(signal, worker_task, scanner_task, listener_task);
            tracing::info!(
                blocks_saved = metrics.blocks_saved.get(),
                accounts_saved = metrics.accounts_saved.get(),
                confirmations = metrics.confirmations_received.get(),
                "mirror stopped cleanly"
            );
        }
    }

    Ok(())
}
