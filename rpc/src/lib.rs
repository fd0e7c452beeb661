//! HTTP RPC client for the remote ledger node.
//!
//! Every call is one JSON `POST` against the node's single RPC endpoint,
//! dispatched by an `action` field. The client owns the retry policy:
//! bounded timeout per call, exponential backoff across attempts, and an
//! error taxonomy separating transient failures (retried) from application
//! errors the node reports inside a 2xx body (never retried).

pub mod client;
pub mod error;
pub mod wire;

pub use client::{RpcClient, RpcConfig};
pub use error::RpcError;
pub use wire::{AccountInfoDto, BlockInfoDto, BlocksInfoDto, LedgerAccountDto};
