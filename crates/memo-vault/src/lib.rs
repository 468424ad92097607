//! # Memo Vault
//!
//! The unified API for Memo Vault - encrypted compliance memos attached to
//! token transfers, readable only by the parties to the transfer.
//!
//! ## Overview
//!
//! Memo Vault provides:
//!
//! - **Sealing**: IVMS payloads encrypted once and key-wrapped per party
//!   (sender, recipient and an optional regulator) using P-256 ECDH
//! - **Ledger**: Encoded memos stored on chain under their memo id, with a
//!   recipient-only delete
//! - **Reading**: Authorization by role followed by local decryption
//! - **Indexing**: Per-address summaries built from contract events, with
//!   deletions recorded as tombstones
//! - **Off-chain memos**: Plaintext records whose id is checked against the
//!   payload's content hash
//!
//! ## Key Concepts
//!
//! - **Memo id**: Keccak-256 of the payload's canonical JSON, unless the
//!   sender chose one.
//! - **Key wrap**: The per-memo content key encrypted for one party.
//! - **Tombstone**: A summary marker that hides a deleted memo for good.
//! - **Checkpoint**: The indexer's resume point, one per run mode.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memo_vault::{MemoVault, MemoryKeyRegistry, MemoryLedger, VaultConfig};
//! use memo_vault::codec::{MemoDraft, MemoVersion};
//! use memo_vault::core::Address;
//! use memo_vault::indexer::MemoryChain;
//! use memo_vault::store::SqliteStore;
//!
//! async fn example(draft: MemoDraft) {
//!     let chain = Arc::new(MemoryChain::new(1_700_000_000));
//!     let contract = Address::from_bytes([0xc0; 20]);
//!
//!     // Local key material lives in SQLite
//!     let keys = SqliteStore::open("memo-vault.db").unwrap();
//!
//!     let vault = MemoVault::new(
//!         MemoryLedger::new(chain, contract),
//!         MemoryKeyRegistry::new(),
//!         keys,
//!         VaultConfig::default(),
//!     );
//!
//!     vault.ensure_key(draft.sender).await.unwrap();
//!     let sent = vault.send(&draft, MemoVersion::V2).await.unwrap();
//!     let opened = vault.read(&sent.memo_id, draft.sender).await.unwrap();
//!     println!("{:?}", opened.payload);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `memo_vault::core` - Core primitives (MemoId, Address, canonical JSON)
//! - `memo_vault::crypto` - P-256 keys, key wrapping and payload encryption
//! - `memo_vault::codec` - Wire schemas, sealing and opening
//! - `memo_vault::store` - Storage abstraction, SQLite and typed repositories
//! - `memo_vault::indexer` - Chain client abstraction and the event indexer

pub mod error;
pub mod ledger;
pub mod offchain;
pub mod vault;

// Re-export component crates
pub use memo_vault_codec as codec;
pub use memo_vault_core as core;
pub use memo_vault_crypto as crypto;
pub use memo_vault_indexer as indexer;
pub use memo_vault_store as store;

// Re-export main types for convenience
pub use error::{MemoError, Result};
pub use ledger::{
    KeyRegistry, LedgerError, LedgerMemo, MemoLedger, MemoryKeyRegistry, MemoryLedger,
    RegisteredKey,
};
pub use offchain::{OffchainMemos, OffchainSubmission};
pub use vault::{MemoVault, OpenedMemo, SentMemo, VaultConfig};

// Re-export commonly used types
pub use memo_vault_codec::{MemoDraft, MemoVersion, NormalizedMemo, WrapRole};
pub use memo_vault_core::{access_message, Address, IvmsPayload, MemoId, TokenInfo};
pub use memo_vault_indexer::{IndexMode, Indexer, IndexerConfig, IndexerReport};
