//! # Memo Vault Core
//!
//! Pure primitives for Memo Vault: memo identifiers, account addresses,
//! the IVMS payload envelope, and canonical JSON hashing.
//!
//! This crate contains no I/O and no cryptography beyond the Keccak-256
//! content hash. Everything here is deterministic computation.
//!
//! ## Key Types
//!
//! - [`MemoId`] - 32-byte memo identifier (content hash or sender-chosen)
//! - [`Address`] - 20-byte account address, always rendered lowercase
//! - [`IvmsPayload`] - The structured metadata carried by a memo
//! - [`TokenInfo`] - Token metadata attached to a transfer memo
//!
//! ## Canonicalization
//!
//! Memo ids are derived from canonical JSON (recursively sorted keys,
//! compact output). See [`canonical`] module.

pub mod access;
pub mod canonical;
pub mod error;
pub mod payload;
pub mod types;

pub use access::access_message;
pub use canonical::{
    canonicalize, canonicalize_serializable, hash, is_valid_memo_id, memo_id_for, verify_memo_id,
};
pub use error::{Result, ValidationError};
pub use payload::{IvmsPayload, PayloadFormat, IVMS_SCHEMA};
pub use types::{Address, MemoId, TokenInfo};

/// Maximum size of an encoded on-chain memo, in bytes.
///
/// Mirrors the byte ceiling enforced by the memo store contract.
pub const MAX_MEMO_BYTES: usize = 2048;

/// Maximum size of the v2 free-text field before base64 encoding.
pub const MAX_ADDITIONAL_INFO_BYTES: usize = 128;

/// Minimum number of key wraps on any encrypted memo (sender + recipient).
pub const MIN_KEY_WRAPS: usize = 2;
