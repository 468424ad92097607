//! Error types for the vault.

use memo_vault_codec::CodecError;
use memo_vault_core::{Address, MemoId, ValidationError};
use memo_vault_crypto::CryptoError;
use memo_vault_indexer::IndexerError;
use memo_vault_store::StoreError;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum MemoError {
    /// Malformed input or a violated memo budget.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Key handling or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("indexer error: {0}")]
    Indexer(#[from] IndexerError),

    /// The contract or its RPC endpoint rejected the call.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The caller is not a party allowed to perform the operation.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("memo not found: {0}")]
    NotFound(MemoId),

    /// The address has no public key in the registry.
    #[error("no registered key for {0}")]
    KeyNotRegistered(Address),
}

impl From<CodecError> for MemoError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Validation(e) => MemoError::Validation(e),
            CodecError::Crypto(e) => MemoError::Crypto(e),
            CodecError::MissingWrap(role) => {
                MemoError::NotAuthorized(format!("memo carries no key for the {}", role))
            }
        }
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, MemoError>;
