//! Error types for Memo Vault core.

use thiserror::Error;

/// Validation errors for ids, addresses and memo structure.
///
/// These surface immediately to the caller; none of them are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Memo id is not `0x` followed by 64 hex characters.
    #[error("invalid memo id: {0}")]
    InvalidMemoId(String),

    /// Address is not `0x` followed by 40 hex characters.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Encoded memo does not fit the on-chain byte ceiling.
    #[error("memo is {size} bytes, exceeds limit of {limit} bytes")]
    SizeBudgetExceeded { size: usize, limit: usize },

    /// Recomputed canonical hash differs from the claimed memo id.
    #[error("memo hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: String },

    /// Free-text additional info exceeds its raw byte cap.
    #[error("additional info is {len} bytes, exceeds limit of {limit} bytes")]
    AdditionalInfoTooLong { len: usize, limit: usize },

    /// Memo carries fewer key wraps than sender + recipient.
    #[error("memo has {0} key wraps, at least 2 are required")]
    TooFewKeyWraps(usize),

    /// Wire discriminant is not a known memo version.
    #[error("unsupported memo version: {0}")]
    UnsupportedVersion(u64),

    /// Structurally invalid memo or payload.
    #[error("malformed memo: {0}")]
    Malformed(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
