//! # Memo Vault Codec
//!
//! Wire schemas for encrypted memos stored on chain.
//!
//! ## Versions
//!
//! | `v` | Shape | Typical size |
//! |-----|-------|--------------|
//! | 1 | Verbose: algorithm ids, public keys and token metadata inline, wraps keyed by address | ~1,860 bytes |
//! | 2 | Compact: short field names, unix timestamp, positional wraps `[sender, recipient, regulator?]` | ~950 bytes |
//!
//! Both shapes are normalized by [`decode`] into a [`NormalizedMemo`], so
//! nothing downstream branches on the version.
//!
//! ## Size Budget
//!
//! The memo store contract rejects call data over
//! [`memo_vault_core::MAX_MEMO_BYTES`]. [`encode`] checks the budget (and the
//! minimum of two key wraps) before returning bytes, so an oversized memo is
//! never submitted.

pub mod additional;
pub mod error;
pub mod memo;
pub mod normalize;
pub mod seal;
pub mod wire;

pub use additional::AdditionalInfo;
pub use error::{CodecError, Result};
pub use memo::{
    AddressedWrap, CompactWrap, OnchainMemo, OnchainMemoV1, OnchainMemoV2, V1Encryption, VersionTag,
    CONTENT_TYPE_JSON,
};
pub use normalize::{MemoVersion, NormalizedMemo, PartyWrap, WrapRole};
pub use seal::{open, seal, MemoDraft, SealedMemo, SealingParties};
pub use wire::{decode, encode, parse, size};
