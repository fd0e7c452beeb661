//! Error type for the sync engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("rpc error: {0}")]
    Rpc(#[from] lattice_rpc::RpcError),

    #[error("store error: {0}")]
    Store(#[from] lattice_store::StoreError),

    #[error("websocket error: {0}")]
    Websocket(String),

    #[error("configuration error: {0}")]
    Config(String),
}
