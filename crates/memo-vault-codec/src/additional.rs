//! Bounded free-text field carried by compact memos.

use memo_vault_core::{ValidationError, MAX_ADDITIONAL_INFO_BYTES};
use memo_vault_crypto::encoding;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Up to 128 raw bytes of sender-supplied text, base64 on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalInfo(Vec<u8>);

impl AdditionalInfo {
    /// Accept `bytes` only if they fit the cap.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ValidationError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_ADDITIONAL_INFO_BYTES {
            return Err(ValidationError::AdditionalInfoTooLong {
                len: bytes.len(),
                limit: MAX_ADDITIONAL_INFO_BYTES,
            });
        }
        Ok(Self(bytes))
    }

    /// Keep the longest prefix of `text` that fits the cap without splitting
    /// a UTF-8 character.
    pub fn truncated(text: &str) -> Self {
        let mut end = text.len().min(MAX_ADDITIONAL_INFO_BYTES);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self(text.as_bytes()[..end].to_vec())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The text, if the bytes are valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Number of raw bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the field is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AdditionalInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encoding::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for AdditionalInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = encoding::decode(&s).map_err(serde::de::Error::custom)?;
        Self::new(bytes).map_err(serde::de::Error::custom)
    }
}
