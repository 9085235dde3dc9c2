//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use memcx_protocol::{transcode, Item, StoreVerb};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// High-level memcached client, one method per verb.
pub struct Client<S = TcpStream> {
    conn: Connection<S>,
}

impl Client<TcpStream> {
    /// Connects to the configured server over TCP.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        Ok(Self {
            conn: Connection::connect(config).await?,
        })
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Client<S> {
    /// Wraps an already-established duplex byte stream.
    pub fn from_stream(stream: S, config: ConnectionConfig) -> Self {
        Self {
            conn: Connection::from_stream(stream, config),
        }
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Fetches one key, reassembling chunked values. A miss is
    /// [`ClientError::NotFound`].
    pub async fn get(&self, key: &str) -> Result<Item, ClientError> {
        self.conn.get(key).await
    }

    /// Fetches several keys in one round trip; absent keys are simply
    /// absent from the map.
    pub async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Item>, ClientError> {
        self.conn.get_multi(keys).await
    }

    /// Stores an item unconditionally.
    pub async fn set(&self, item: &Item) -> Result<(), ClientError> {
        self.conn.store(StoreVerb::Set, item).await
    }

    /// Stores an item only if the key is absent; otherwise
    /// [`ClientError::NotStored`].
    pub async fn add(&self, item: &Item) -> Result<(), ClientError> {
        self.conn.store(StoreVerb::Add, item).await
    }

    /// Stores an item only if the key is present; otherwise
    /// [`ClientError::NotStored`].
    pub async fn replace(&self, item: &Item) -> Result<(), ClientError> {
        self.conn.store(StoreVerb::Replace, item).await
    }

    /// Compare-and-swap using `item.cas_id` from a previous [`Client::get`].
    /// An intervening write fails the call with [`ClientError::CasConflict`];
    /// re-fetch to obtain a fresh token.
    pub async fn cas(&self, item: &Item) -> Result<(), ClientError> {
        self.conn.store(StoreVerb::Cas, item).await
    }

    /// Deletes a key.
    pub async fn delete(&self, key: &str) -> Result<(), ClientError> {
        self.conn.delete(key).await
    }

    /// Invalidates every item on the server.
    pub async fn flush(&self) -> Result<(), ClientError> {
        self.conn.flush().await
    }

    /// Decodes a fetched JSON-encoded item into `T`. No I/O.
    pub fn scan<T: DeserializeOwned>(&self, item: &Item) -> Result<T, ClientError> {
        Ok(transcode::decode(item)?)
    }
}
