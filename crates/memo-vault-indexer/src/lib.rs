//! # Memo Vault Indexer
//!
//! Replays `MemoStored` / `MemoDeleted` events from the memo store contract
//! into per-address summaries.
//!
//! ## Overview
//!
//! A run resolves where to start, walks the chain in bounded chunks up to
//! the head, and saves a checkpoint once the whole range is done. A run that
//! fails part way saves nothing, so the next run starts again from the last
//! saved checkpoint.
//!
//! ## Key Properties
//!
//! - **Idempotent**: Replaying a block range rewrites the same documents
//! - **Resumable**: Automatic and manual runs keep separate cursors
//! - **Deletion wins**: A tombstone is never replaced by a replayed summary
//!
//! ## Run Flow
//!
//! ```text
//! Idle
//!   -> ResolveStartBlock --(start > head)--> NoNewBlocks -> save head
//!   -> ScanChunk [from, min(from + range - 1, head)]  (repeat)
//!   -> PersistCheckpoint
//!   -> Done
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memo_vault_indexer::{Indexer, IndexerConfig, IndexMode, MemoryChain};
//! use memo_vault_store::{BlobCheckpointRepository, MemoryStore};
//!
//! async fn example() -> memo_vault_indexer::Result<()> {
//!     let chain = Arc::new(MemoryChain::new(1_700_000_000));
//!     let blobs = Arc::new(MemoryStore::new());
//!     let checkpoints = BlobCheckpointRepository::new(blobs.clone());
//!
//!     let indexer = Indexer::new(chain, blobs, checkpoints, IndexerConfig::from_env()?);
//!     let report = indexer.run(IndexMode::Automatic).await?;
//!     println!("{:?}", report);
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod scanner;

pub use chain::{memory::MemoryChain, ChainClient, ChainError, MemoDeletedLog, MemoStoredLog};
pub use config::{ConfigError, IndexerConfig};
pub use error::{IndexerError, Result};
pub use memo_vault_store::IndexMode;
pub use scanner::{Indexer, IndexerReport};
