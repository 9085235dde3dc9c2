//! Request formatting and key validation.
//!
//! Chunked values are stored under derived keys built by appending a 1-based
//! decimal index to the original key (`"foo"` -> `"foo1"`, `"foo2"`, ...).
//! This namespacing can collide with a legitimately distinct key such as a
//! real `"foo1"`; it is kept as-is for on-wire compatibility with existing
//! deployments.

use crate::{CRLF, MAX_KEY_LEN};
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Store-family verbs. All four share one request grammar; only `cas`
/// appends the CAS token field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreVerb {
    Set,
    Add,
    Replace,
    Cas,
}

impl StoreVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreVerb::Set => "set",
            StoreVerb::Add => "add",
            StoreVerb::Replace => "replace",
            StoreVerb::Cas => "cas",
        }
    }
}

impl fmt::Display for StoreVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns whether `key` may be sent to the server: at most
/// [`MAX_KEY_LEN`] bytes, no byte below `!` (space and control characters)
/// and no DEL.
pub fn valid_key(key: &str) -> bool {
    if key.len() > MAX_KEY_LEN {
        return false;
    }
    key.bytes().all(|b| b > 0x20 && b != 0x7f)
}

/// Formats a store request:
/// `<verb> <key> <flags> <expiration> <len>[ <cas_id>]\r\n<payload>\r\n`.
pub fn encode_store(
    verb: StoreVerb,
    key: &str,
    flags: u32,
    expiration: u32,
    payload: &[u8],
    cas_id: u64,
) -> BytesMut {
    let header = match verb {
        StoreVerb::Cas => format!(
            "{verb} {key} {flags} {expiration} {len} {cas_id}\r\n",
            len = payload.len()
        ),
        _ => format!(
            "{verb} {key} {flags} {expiration} {len}\r\n",
            len = payload.len()
        ),
    };
    let mut buf = BytesMut::with_capacity(header.len() + payload.len() + CRLF.len());
    buf.put_slice(header.as_bytes());
    buf.put_slice(payload);
    buf.put_slice(CRLF);
    buf
}

/// Formats a fetch request: `gets <key1> <key2> ...\r\n`.
///
/// The `gets` form is used even for a single key so a CAS token is always
/// returned.
pub fn encode_gets(keys: &[&str]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(8 + keys.iter().map(|k| k.len() + 1).sum::<usize>());
    buf.put_slice(b"gets ");
    buf.put_slice(keys.join(" ").as_bytes());
    buf.put_slice(CRLF);
    buf
}

/// Formats a delete request: `delete <key>\r\n`.
pub fn encode_delete(key: &str) -> BytesMut {
    let mut buf = BytesMut::with_capacity(8 + key.len() + CRLF.len());
    buf.put_slice(b"delete ");
    buf.put_slice(key.as_bytes());
    buf.put_slice(CRLF);
    buf
}

/// Formats a flush request. The trailing space matches what servers have
/// been receiving from existing clients.
pub fn encode_flush() -> BytesMut {
    BytesMut::from(&b"flush_all \r\n"[..])
}
