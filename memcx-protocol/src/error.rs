//! Protocol error types.

use thiserror::Error;

/// Errors produced while formatting requests or parsing responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed VALUE header: {0:?}")]
    BadValueHeader(String),

    #[error("value data is not terminated with CRLF")]
    BadTrailer,

    #[error("chunked length prefix is not a decimal integer: {0:?}")]
    BadLengthPrefix(String),

    #[error("invalid UTF-8 in response line")]
    InvalidUtf8,

    #[error("item does not carry a JSON-encoded value")]
    NotJson,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
