//! Raw/JSON value transcoding.

use crate::error::ProtocolError;
use crate::item::{Item, ItemValue};
use crate::FLAG_JSON;
use serde::de::DeserializeOwned;

/// Encodes item values into wire payloads.
///
/// Owns a scratch buffer that is reset before every encode. One instance
/// per session; the session's single-operation discipline keeps encodes
/// from overlapping.
#[derive(Debug, Default)]
pub struct Transcoder {
    scratch: Vec<u8>,
}

impl Transcoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wire payload for `item`'s value.
    ///
    /// Raw values are passed through unchanged; structured values are
    /// JSON-serialized into the scratch buffer.
    pub fn encode<'a>(&'a mut self, item: &'a Item) -> Result<&'a [u8], ProtocolError> {
        match &item.value {
            ItemValue::Raw(bytes) => Ok(bytes),
            ItemValue::Json(value) => {
                self.scratch.clear();
                serde_json::to_writer(&mut self.scratch, value)?;
                Ok(&self.scratch)
            }
        }
    }
}

/// Decodes a JSON-encoded item into `T`.
///
/// Only valid when the item's encoding bits select JSON; raw items expose
/// their bytes through [`Item::bytes`] without transformation.
pub fn decode<T: DeserializeOwned>(item: &Item) -> Result<T, ProtocolError> {
    if item.encoding() != FLAG_JSON {
        return Err(ProtocolError::NotJson);
    }
    match &item.value {
        ItemValue::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
        ItemValue::Json(value) => Ok(serde_json::from_value(value.clone())?),
    }
}
