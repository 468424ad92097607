//! The IVMS payload envelope.
//!
//! The payload body is opaque: the core only canonicalizes and hashes it.

use serde::{Deserialize, Serialize};

/// Schema tag carried by every payload.
pub const IVMS_SCHEMA: &str = "ivms-1";

/// How the payload body should be interpreted by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Structured JSON document.
    Json,
    /// Free text.
    Text,
}

/// Travel-rule metadata attached to a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvmsPayload {
    /// Always [`IVMS_SCHEMA`] for payloads produced by this crate.
    pub schema: String,
    /// Interpretation of `payload`.
    pub format: PayloadFormat,
    /// The payload body.
    pub payload: serde_json::Value,
}

impl IvmsPayload {
    /// Wrap a structured JSON body.
    pub fn json(payload: serde_json::Value) -> Self {
        Self {
            schema: IVMS_SCHEMA.to_string(),
            format: PayloadFormat::Json,
            payload,
        }
    }

    /// Wrap a free-text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            schema: IVMS_SCHEMA.to_string(),
            format: PayloadFormat::Text,
            payload: serde_json::Value::String(text.into()),
        }
    }
}
