//! Error types for the codec.

use memo_vault_core::ValidationError;
use memo_vault_crypto::CryptoError;
use thiserror::Error;

use crate::normalize::WrapRole;

/// Errors from encoding, decoding, sealing and opening memos.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Structural or budget violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Encryption or key handling failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The memo carries no wrap for the requested party.
    #[error("memo has no key wrap for the {0}")]
    MissingWrap(WrapRole),
}

impl CodecError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CodecError::Validation(ValidationError::Malformed(msg.into()))
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
