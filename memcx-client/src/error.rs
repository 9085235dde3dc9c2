//! Client error types.

use memcx_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("key is too long or contains invalid characters")]
    InvalidKey,

    #[error("item not stored")]
    NotStored,

    #[error("compare-and-swap conflict")]
    CasConflict,

    #[error("cache miss")]
    CacheMiss,

    #[error("item not found")]
    NotFound,

    #[error("unexpected server response: {0:?}")]
    UnexpectedResponse(String),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,
}

impl ClientError {
    /// Returns whether this error is retryable on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::Timeout | ClientError::ConnectionClosed
        )
    }
}
