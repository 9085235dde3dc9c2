//! # memcx-client
//!
//! Async client for the memcached ASCII protocol.
//!
//! This crate provides:
//! - A single-connection session with per-operation read/write deadlines
//! - `get`/`get_multi`/`set`/`add`/`replace`/`cas`/`delete`/`flush`
//! - Transparent chunking of values too large for one record
//! - Raw or JSON value encoding, selected per item

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use memcx_protocol as protocol;
pub use memcx_protocol::{Item, ItemValue};
