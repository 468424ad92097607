//! # Memo Vault Store
//!
//! Storage abstraction for Memo Vault. Everything the service persists is a
//! small JSON document under a string key, so the backends only need to
//! implement the [`BlobStore`] trait; typed repositories sit on top.
//!
//! ## Key Types
//!
//! - [`BlobStore`] - Async keyed blob storage with prefix listing
//! - [`KeyStore`] - Per-address local key material
//! - [`SummaryStore`] - Per-address memo summaries and deletion tombstones
//! - [`CheckpointRepository`] - Indexer cursor persistence
//! - [`MemoRecordStore`] - Off-chain memo records
//! - [`SqliteStore`] - SQLite-backed persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Key Layout
//!
//! ```text
//! memos/by-address/<lowercase address>/<memo id>.json   address summary or tombstone
//! memos/onchain-indexer/state.json                     indexer checkpoint
//! memos/<memo id>/record.json                          off-chain memo record
//! ```
//!
//! ## Design Notes
//!
//! - **Overwrite semantics**: a put replaces the value under its key; nothing
//!   is ever appended, so replaying writes is idempotent.
//! - **Lowercase namespaces**: address-derived keys always use the lowercase
//!   address.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod migration;
pub mod record;
pub mod sqlite;
pub mod summary;
pub mod traits;

pub use checkpoint::{
    BlobCheckpointRepository, CheckpointRepository, IndexMode, IndexerCheckpoint, CHECKPOINT_KEY,
};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use record::{MemoRecord, MemoRecordStore};
pub use sqlite::SqliteStore;
pub use summary::{
    AddressSummary, SummaryDocument, SummaryRole, SummarySource, SummaryStore, Tombstone,
};
pub use traits::{BlobStore, BlobStoreExt, KeyStore};
