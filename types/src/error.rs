use thiserror::Error;

/// Failures decoding externally supplied ledger values (addresses, hashes,
/// decimal amounts).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid block hash: {0}")]
    InvalidHash(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid block kind: {0}")]
    InvalidBlockKind(String),
}
