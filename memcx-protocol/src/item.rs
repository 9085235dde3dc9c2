//! Cache item data model.

use crate::{FLAG_CHUNKED, FLAG_JSON, FLAG_RAW};
use bytes::Bytes;
use serde_json::Value;

/// The logical value carried by an [`Item`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    /// Opaque bytes, stored verbatim.
    Raw(Bytes),
    /// Structured value, serialized as JSON on the wire.
    Json(Value),
}

/// An item to be fetched from or stored in a memcached server.
#[derive(Debug, Clone)]
pub struct Item {
    /// Key, at most 250 bytes with no spaces or control characters.
    pub key: String,
    /// The value. Fetched items always carry [`ItemValue::Raw`]; the flags
    /// say how to decode it.
    pub value: ItemValue,
    /// 32-bit flags stored alongside the value. The low bits select the
    /// value encoding; bit 30 is reserved for the chunk marker.
    pub flags: u32,
    /// Seconds until expiry, forwarded to the server verbatim.
    pub expiration: u32,
    /// CAS token returned by a fetch; required by the `cas` verb.
    pub cas_id: u64,
}

impl Item {
    /// Creates an item holding raw bytes.
    pub fn raw(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: ItemValue::Raw(value.into()),
            flags: FLAG_RAW,
            expiration: 0,
            cas_id: 0,
        }
    }

    /// Creates an item holding a structured value, JSON-encoded on store.
    pub fn json(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value: ItemValue::Json(value),
            flags: FLAG_JSON,
            expiration: 0,
            cas_id: 0,
        }
    }

    pub fn with_expiration(mut self, seconds: u32) -> Self {
        self.expiration = seconds;
        self
    }

    pub fn with_cas(mut self, cas_id: u64) -> Self {
        self.cas_id = cas_id;
        self
    }

    /// The encoding bits of the flags, with the chunk marker masked off.
    pub fn encoding(&self) -> u32 {
        self.flags & !FLAG_CHUNKED
    }

    /// Whether the chunk marker is set on the flags.
    pub fn is_chunked(&self) -> bool {
        self.flags & FLAG_CHUNKED != 0
    }

    /// The raw bytes of the value, if this item holds raw bytes.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            ItemValue::Raw(bytes) => Some(bytes),
            ItemValue::Json(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_item() {
        let item = Item::raw("color", &b"red"[..]);
        assert_eq!(item.flags, FLAG_RAW);
        assert_eq!(item.encoding(), FLAG_RAW);
        assert_eq!(item.bytes(), Some(&b"red"[..]));
        assert!(!item.is_chunked());
    }

    #[test]
    fn test_json_item() {
        let item = Item::json("user", json!({"name": "ada"}));
        assert_eq!(item.flags, FLAG_JSON);
        assert_eq!(item.bytes(), None);
    }

    #[test]
    fn test_builders() {
        let item = Item::raw("k", &b"v"[..]).with_expiration(60).with_cas(7);
        assert_eq!(item.expiration, 60);
        assert_eq!(item.cas_id, 7);
    }

    #[test]
    fn test_chunk_marker_masked_from_encoding() {
        let mut item = Item::json("k", json!(1));
        item.flags |= FLAG_CHUNKED;
        assert!(item.is_chunked());
        assert_eq!(item.encoding(), FLAG_JSON);
    }
}
