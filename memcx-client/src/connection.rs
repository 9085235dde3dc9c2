//! Connection session and the request/response cycle.
//!
//! A [`Connection`] owns one duplex byte stream and runs one operation at a
//! time: format the request, write and flush under the write deadline, then
//! read and classify the response under the read deadline. Values at or
//! above [`CHUNK_SIZE`] are split across derived chunk keys on store and
//! reassembled on fetch.

use crate::error::ClientError;
use bytes::Bytes;
use memcx_protocol::command::{self, StoreVerb};
use memcx_protocol::response::{ResponseLine, ValueHeader};
use memcx_protocol::{Item, ItemValue, ProtocolError, Transcoder, CHUNK_SIZE, CRLF, FLAG_CHUNKED};
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Deadline applied before every read; `None` never times out.
    pub read_timeout: Option<Duration>,
    /// Deadline applied before every write+flush; `None` never times out.
    pub write_timeout: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}

/// One session: the buffered duplex stream plus the transcoding scratch.
struct Session<S> {
    stream: BufStream<S>,
    transcoder: Transcoder,
}

/// A connection to a memcached server.
///
/// The session mutex serializes operations (one outstanding request per
/// connection, no pipelining) and synchronizes [`Connection::close`]
/// against in-flight I/O. Callers needing concurrency should open
/// independent connections.
pub struct Connection<S = TcpStream> {
    config: ConnectionConfig,
    session: Mutex<Option<Session<S>>>,
}

impl Connection<TcpStream> {
    /// Connects to the configured server over TCP.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        tracing::debug!("connecting to {}", config.addr);
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.addr))
            .await
            .map_err(|_| ClientError::Timeout)??;
        stream.set_nodelay(true).ok();
        Ok(Self::from_stream(stream, config))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Connection<S> {
    /// Wraps an already-established duplex byte stream.
    pub fn from_stream(stream: S, config: ConnectionConfig) -> Self {
        Self {
            config,
            session: Mutex::new(Some(Session {
                stream: BufStream::new(stream),
                transcoder: Transcoder::new(),
            })),
        }
    }

    /// Returns whether the session is still open. A session locked by an
    /// in-flight operation counts as open.
    pub fn is_connected(&self) -> bool {
        match self.session.try_lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => true,
        }
    }

    /// Closes the connection. Safe to call concurrently with an in-flight
    /// operation; subsequent operations observe [`ClientError::NotConnected`].
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(mut session) = self.session.lock().await.take() {
            tracing::debug!("closing connection");
            let _ = session.stream.shutdown().await;
        }
        Ok(())
    }

    /// Fetches a single key. Chunked values are reassembled transparently.
    pub async fn get(&self, key: &str) -> Result<Item, ClientError> {
        if !command::valid_key(key) {
            return Err(ClientError::InvalidKey);
        }
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let mut found = None;
        self.fetch(&mut session.stream, &[key], &mut |item| found = Some(item))
            .await?;
        let item = found.ok_or(ClientError::NotFound)?;
        if !item.is_chunked() {
            return Ok(item);
        }
        self.reassemble(&mut session.stream, key, item).await
    }

    /// Fetches several keys in one round trip. Absent keys are simply
    /// absent from the result; chunked entries are not reassembled.
    pub async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Item>, ClientError> {
        for key in keys {
            if !command::valid_key(key) {
                return Err(ClientError::InvalidKey);
            }
        }
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let mut items = HashMap::with_capacity(keys.len());
        self.fetch(&mut session.stream, keys, &mut |item| {
            items.insert(item.key.clone(), item);
        })
        .await?;
        Ok(items)
    }

    /// Runs one store-family verb. Oversized payloads are written as a
    /// length record plus chunk records, one full round trip each; the
    /// first failure aborts with no rollback of already-stored chunks.
    pub async fn store(&self, verb: StoreVerb, item: &Item) -> Result<(), ClientError> {
        if !command::valid_key(&item.key) {
            return Err(ClientError::InvalidKey);
        }
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let Session { stream, transcoder } = session;
        let payload = transcoder.encode(item)?;

        if payload.len() < CHUNK_SIZE {
            return self
                .store_record(
                    stream,
                    verb,
                    &item.key,
                    item.flags,
                    item.expiration,
                    item.cas_id,
                    payload,
                )
                .await;
        }

        let length = payload.len();
        let total = length.div_ceil(CHUNK_SIZE);
        let flags = item.flags | FLAG_CHUNKED;
        tracing::debug!(
            key = %item.key,
            length,
            chunks = total,
            "splitting oversized value"
        );
        self.store_record(
            stream,
            verb,
            &item.key,
            flags,
            item.expiration,
            item.cas_id,
            length.to_string().as_bytes(),
        )
        .await?;
        for (i, chunk) in payload.chunks(CHUNK_SIZE).enumerate() {
            let chunk_key = format!("{}{}", item.key, i + 1);
            self.store_record(
                stream,
                verb,
                &chunk_key,
                flags,
                item.expiration,
                item.cas_id,
                chunk,
            )
            .await?;
        }
        Ok(())
    }

    /// Deletes a key. Any response other than `DELETED` (including
    /// `NOT_FOUND`) is surfaced with its raw line.
    pub async fn delete(&self, key: &str) -> Result<(), ClientError> {
        if !command::valid_key(key) {
            return Err(ClientError::InvalidKey);
        }
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let request = command::encode_delete(key);
        let line = self.round_trip_line(&mut session.stream, &request).await?;
        match ResponseLine::parse(&line) {
            ResponseLine::Deleted => Ok(()),
            _ => Err(unexpected(&line)),
        }
    }

    /// Invalidates every item on the server.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let request = command::encode_flush();
        let line = self.round_trip_line(&mut session.stream, &request).await?;
        match ResponseLine::parse(&line) {
            ResponseLine::Ok => Ok(()),
            _ => Err(unexpected(&line)),
        }
    }

    /// Issues `gets` for `keys` and feeds every returned record to `found`
    /// until the terminal `END` line.
    async fn fetch(
        &self,
        stream: &mut BufStream<S>,
        keys: &[&str],
        found: &mut dyn FnMut(Item),
    ) -> Result<(), ClientError> {
        let request = command::encode_gets(keys);
        self.write_flush(stream, &request).await?;
        loop {
            let line = self.read_line(stream).await?;
            if ResponseLine::parse(&line) == ResponseLine::End {
                return Ok(());
            }
            let header = ValueHeader::parse(&line)?;
            let payload = self.read_payload(stream, header.len).await?;
            found(Item {
                key: header.key,
                value: ItemValue::Raw(payload),
                flags: header.flags,
                expiration: 0,
                cas_id: header.cas_id,
            });
        }
    }

    /// Resolves a chunked primary record: parse the declared length, fetch
    /// every derived chunk key, and concatenate in key order. Missing
    /// chunks are a cache miss since they can expire independently.
    async fn reassemble(
        &self,
        stream: &mut BufStream<S>,
        key: &str,
        primary: Item,
    ) -> Result<Item, ClientError> {
        let bytes = primary.bytes().unwrap_or_default();
        let declared: usize = std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| {
                ProtocolError::BadLengthPrefix(String::from_utf8_lossy(bytes).into_owned())
            })?;
        let total = declared.div_ceil(CHUNK_SIZE).max(1);

        let keys: Vec<String> = (1..=total).map(|i| format!("{key}{i}")).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let mut chunks: HashMap<String, Item> = HashMap::with_capacity(total);
        self.fetch(stream, &key_refs, &mut |item| {
            chunks.insert(item.key.clone(), item);
        })
        .await?;
        if chunks.len() != total {
            return Err(ClientError::CacheMiss);
        }

        let mut value = Vec::with_capacity(declared);
        for chunk_key in &keys {
            let chunk = chunks
                .get(chunk_key)
                .and_then(|item| item.bytes())
                .ok_or(ClientError::CacheMiss)?;
            value.extend_from_slice(chunk);
        }
        Ok(Item {
            key: primary.key,
            value: ItemValue::Raw(value.into()),
            flags: primary.flags & !FLAG_CHUNKED,
            expiration: primary.expiration,
            cas_id: primary.cas_id,
        })
    }

    /// One store round trip: request, payload, status line, classification.
    async fn store_record(
        &self,
        stream: &mut BufStream<S>,
        verb: StoreVerb,
        key: &str,
        flags: u32,
        expiration: u32,
        cas_id: u64,
        payload: &[u8],
    ) -> Result<(), ClientError> {
        let request = command::encode_store(verb, key, flags, expiration, payload, cas_id);
        let line = self.round_trip_line(stream, &request).await?;
        match ResponseLine::parse(&line) {
            ResponseLine::Stored => Ok(()),
            ResponseLine::NotStored => Err(ClientError::NotStored),
            ResponseLine::Exists => Err(ClientError::CasConflict),
            ResponseLine::NotFound => Err(ClientError::CacheMiss),
            _ => Err(unexpected(&line)),
        }
    }

    async fn round_trip_line(
        &self,
        stream: &mut BufStream<S>,
        request: &[u8],
    ) -> Result<Vec<u8>, ClientError> {
        self.write_flush(stream, request).await?;
        self.read_line(stream).await
    }

    async fn write_flush(
        &self,
        stream: &mut BufStream<S>,
        request: &[u8],
    ) -> Result<(), ClientError> {
        timed(self.config.write_timeout, async {
            stream.write_all(request).await?;
            stream.flush().await
        })
        .await
    }

    /// Reads one line, terminator included. Zero bytes means the peer
    /// closed the stream.
    async fn read_line(&self, stream: &mut BufStream<S>) -> Result<Vec<u8>, ClientError> {
        let mut line = Vec::new();
        let n = timed(
            self.config.read_timeout,
            stream.read_until(b'\n', &mut line),
        )
        .await?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(line)
    }

    /// Reads exactly `len` payload bytes plus the CRLF terminator, which
    /// must be present verbatim; otherwise the value is discarded.
    async fn read_payload(
        &self,
        stream: &mut BufStream<S>,
        len: usize,
    ) -> Result<Bytes, ClientError> {
        let mut buf = vec![0u8; len + CRLF.len()];
        timed(self.config.read_timeout, stream.read_exact(&mut buf)).await?;
        if !buf.ends_with(CRLF) {
            return Err(ProtocolError::BadTrailer.into());
        }
        buf.truncate(len);
        Ok(Bytes::from(buf))
    }
}

fn unexpected(line: &[u8]) -> ClientError {
    ClientError::UnexpectedResponse(String::from_utf8_lossy(line).trim_end().to_string())
}

/// Runs `op` under an optional deadline, mapping expiry to
/// [`ClientError::Timeout`].
async fn timed<T>(
    limit: Option<Duration>,
    op: impl Future<Output = io::Result<T>>,
) -> Result<T, ClientError> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClientError::Timeout),
        },
        None => Ok(op.await?),
    }
}
