//! Prometheus metrics for the sync engine.
//!
//! The [`SyncMetrics`] struct owns a dedicated [`Registry`] the daemon can
//! encode into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Central collection of sync-engine Prometheus metrics.
pub struct SyncMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks written through the block store upsert.
    pub blocks_saved: IntCounter,
    /// Account records written through the account store upsert.
    pub accounts_saved: IntCounter,
    /// Confirmation events received on the realtime feed.
    pub confirmations_received: IntCounter,
    /// Reconnection attempts made by the realtime feed.
    pub feed_reconnects: IntCounter,
    /// Accounts the staleness scanner found behind the remote.
    pub stale_accounts_found: IntCounter,
    /// Accounts abandoned after hitting the consecutive-failure ceiling.
    pub accounts_abandoned: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current depth of the per-account update queue.
    pub update_queue_depth: IntGauge,
}

impl SyncMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_saved = register_int_counter_with_registry!(
            Opts::new("lattice_blocks_saved_total", "Blocks upserted into the block store"),
            registry
        )
        .expect("failed to register blocks_saved counter");

        let accounts_saved = register_int_counter_with_registry!(
            Opts::new(
                "lattice_accounts_saved_total",
                "Account records upserted into the account store"
            ),
            registry
        )
        .expect("failed to register accounts_saved counter");

        let confirmations_received = register_int_counter_with_registry!(
            Opts::new(
                "lattice_confirmations_received_total",
                "Confirmation events received on the realtime feed"
            ),
            registry
        )
        .expect("failed to register confirmations_received counter");

        let feed_reconnects = register_int_counter_with_registry!(
            Opts::new(
                "lattice_feed_reconnects_total",
                "Reconnection attempts on the realtime feed"
            ),
            registry
        )
        .expect("failed to register feed_reconnects counter");

        let stale_accounts_found = register_int_counter_with_registry!(
            Opts::new(
                "lattice_stale_accounts_total",
                "Accounts found lagging behind the remote block count"
            ),
            registry
        )
        .expect("failed to register stale_accounts_found counter");

        let accounts_abandoned = register_int_counter_with_registry!(
            Opts::new(
                "lattice_accounts_abandoned_total",
                "Accounts abandoned after consecutive failures"
            ),
            registry
        )
        .expect("failed to register accounts_abandoned counter");

        let update_queue_depth = register_int_gauge_with_registry!(
            Opts::new(
                "lattice_update_queue_depth",
                "Current depth of the per-account update queue"
            ),
            registry
        )
        .expect("failed to register update_queue_depth gauge");

        Self {
            registry,
            blocks_saved,
            accounts_saved,
            confirmations_received,
            feed_reconnects,
            stale_accounts_found,
            accounts_abandoned,
            update_queue_depth,
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}
