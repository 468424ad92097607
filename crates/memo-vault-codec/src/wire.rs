//! Encoding to and decoding from contract call data.

use memo_vault_core::{ValidationError, MAX_MEMO_BYTES, MIN_KEY_WRAPS};
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::memo::{OnchainMemo, OnchainMemoV1, OnchainMemoV2};
use crate::normalize::NormalizedMemo;

fn to_json(memo: &OnchainMemo) -> Result<Vec<u8>> {
    serde_json::to_vec(memo).map_err(|e| CodecError::malformed(e.to_string()))
}

/// UTF-8 byte length of the memo's compact JSON encoding.
pub fn size(memo: &OnchainMemo) -> Result<usize> {
    Ok(to_json(memo)?.len())
}

/// Encode a memo for submission.
///
/// Fails unless the memo carries at least two key wraps and its encoding
/// fits within [`MAX_MEMO_BYTES`].
pub fn encode(memo: &OnchainMemo) -> Result<Vec<u8>> {
    let wraps = memo.wrap_count();
    if wraps < MIN_KEY_WRAPS {
        return Err(ValidationError::TooFewKeyWraps(wraps).into());
    }

    let bytes = to_json(memo)?;
    if bytes.len() > MAX_MEMO_BYTES {
        return Err(ValidationError::SizeBudgetExceeded {
            size: bytes.len(),
            limit: MAX_MEMO_BYTES,
        }
        .into());
    }
    Ok(bytes)
}

/// Parse call data into the matching wire shape.
///
/// The integer `v` field picks the shape; any other value is rejected as an
/// unsupported version.
pub fn parse(bytes: &[u8]) -> Result<OnchainMemo> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CodecError::malformed(format!("invalid json: {}", e)))?;

    let version = value
        .get("v")
        .and_then(Value::as_u64)
        .ok_or_else(|| CodecError::malformed("missing integer version field"))?;

    let memo = match version {
        1 => OnchainMemo::V1(
            serde_json::from_value::<OnchainMemoV1>(value)
                .map_err(|e| CodecError::malformed(format!("v1: {}", e)))?,
        ),
        2 => OnchainMemo::V2(
            serde_json::from_value::<OnchainMemoV2>(value)
                .map_err(|e| CodecError::malformed(format!("v2: {}", e)))?,
        ),
        other => return Err(ValidationError::UnsupportedVersion(other).into()),
    };
    Ok(memo)
}

/// Parse call data and normalize it.
pub fn decode(bytes: &[u8]) -> Result<NormalizedMemo> {
    NormalizedMemo::try_from(parse(bytes)?)
}
