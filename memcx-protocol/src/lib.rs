//! # memcx-protocol
//!
//! Wire layer for the memcached ASCII protocol.
//!
//! This crate provides:
//! - Request formatting for the store/fetch/delete/flush verb families
//! - Response grammar: the closed status-line vocabulary and `VALUE` headers
//! - Raw/JSON value transcoding
//! - Key validation and protocol constants
//!
//! It performs no I/O; the session layer lives in `memcx-client`.

pub mod command;
pub mod error;
pub mod item;
pub mod response;
pub mod transcode;

pub use command::{valid_key, StoreVerb};
pub use error::ProtocolError;
pub use item::{Item, ItemValue};
pub use response::{ResponseLine, ValueHeader};
pub use transcode::Transcoder;

/// Default port for a memcached server.
pub const DEFAULT_PORT: u16 = 11211;

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 250;

/// Maximum size of a single stored record. Values at or above this size
/// are split across derived chunk keys by the client.
pub const CHUNK_SIZE: usize = 1_000_000;

/// Flags value selecting the raw (pass-through) value encoding.
pub const FLAG_RAW: u32 = 0;

/// Flags value selecting the JSON value encoding.
pub const FLAG_JSON: u32 = 1;

/// Oversize marker: the record's payload is the ASCII decimal length of a
/// chunked value, not the value itself. Set and cleared by the client;
/// never visible to callers.
pub const FLAG_CHUNKED: u32 = 1 << 30;

/// Line terminator for every request and response line.
pub const CRLF: &[u8] = b"\r\n";
