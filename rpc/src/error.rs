//! RPC error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Network-level failure: connect error, timeout, reset. Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a non-2xx status. Retryable.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The node answered 2xx but reported an application error in the body
    /// (e.g. "Account not found"). Never retried.
    #[error("node error: {0}")]
    Node(String),

    /// The body did not decode into the expected shape. Retried like a
    /// transient failure: in practice these are truncated or proxied
    /// responses, not stable node behavior.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Whether the retry loop should attempt this call again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RpcError::Node(_))
    }
}
