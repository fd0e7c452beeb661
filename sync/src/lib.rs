//! Incremental ledger synchronization engine.
//!
//! Three cooperating writers converge the local store toward the remote
//! node's ledger:
//! - the [`BackfillWalker`] sweeps the global account list and walks each
//!   chain backward from its frontier,
//! - the [`ConfirmationListener`] buffers the realtime confirmation feed
//!   and flushes it on fixed cadences,
//! - the [`StalenessScanner`] re-checks recently modified accounts and
//!   queues catch-up work for any that lag.
//!
//! No ordering is required between them: every block write goes through
//! the store's field-wise merge upsert, which is commutative and
//! idempotent, so whichever writer lands last cannot regress the row.

pub mod account_sync;
pub mod backfill;
pub mod config;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod scanner;
pub mod shutdown;
pub mod update_queue;

pub use account_sync::{sync_account_blocks, TraversalMode, WalkOutcome, WalkPolicy};
pub use backfill::{BackfillOptions, BackfillSummary, BackfillWalker};
pub use config::SyncConfig;
pub use error::SyncError;
pub use listener::ConfirmationListener;
pub use metrics::SyncMetrics;
pub use scanner::StalenessScanner;
pub use shutdown::Shutdown;
pub use update_queue::{update_queue, CatchUpJob, UpdateQueue, UpdateWorker};
