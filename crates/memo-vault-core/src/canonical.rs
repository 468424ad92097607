//! Canonical JSON and content hashing.
//!
//! Canonical form:
//! - Object keys sorted by the byte order of their UTF-8 encoding, recursively
//! - Array element order preserved
//! - Compact output (no insignificant whitespace)
//!
//! The memo id of a payload is the Keccak-256 hash of its canonical form,
//! so two documents that differ only by key order share one id.

use serde::Serialize;
use serde_json::{Map, Value};
use sha3::{Digest, Keccak256};

use crate::error::{Result, ValidationError};
use crate::types::MemoId;

/// Rebuild a value with every object's keys in sorted order.
fn sort_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key.clone(), sort_value(val));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

/// Produce the canonical string for a JSON value.
pub fn canonicalize(value: &Value) -> String {
    sort_value(value).to_string()
}

/// Serialize any value to JSON, then canonicalize it.
pub fn canonicalize_serializable<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Ok(canonicalize(&json))
}

/// Keccak-256 of the canonical string's UTF-8 bytes.
pub fn hash(canonical: &str) -> MemoId {
    let digest = Keccak256::digest(canonical.as_bytes());
    MemoId::from_bytes(digest.into())
}

/// Content-derived memo id: `hash(canonicalize(value))`.
pub fn memo_id_for<T: Serialize + ?Sized>(value: &T) -> Result<MemoId> {
    Ok(hash(&canonicalize_serializable(value)?))
}

/// Strict textual check: `0x` followed by exactly 64 lowercase hex digits.
pub fn is_valid_memo_id(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(digits) => {
            digits.len() == 64
                && digits
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        }
        None => false,
    }
}

/// Recompute the hash of `canonical` and compare it with `memo_id`.
pub fn verify_memo_id(memo_id: &MemoId, canonical: &str) -> Result<()> {
    let computed = hash(canonical);
    if computed != *memo_id {
        return Err(ValidationError::HashMismatch {
            expected: memo_id.to_hex(),
            computed: computed.to_hex(),
        });
    }
    Ok(())
}
