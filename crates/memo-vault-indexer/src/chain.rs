//! Chain access for the indexer.
//!
//! The indexer only needs four read calls: the head block number, a block's
//! timestamp, and the two memo event queries. Implementations own any RPC
//! retry or timeout policy.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use memo_vault_core::{Address, MemoId};
use thiserror::Error;

/// `MemoStored(bytes32 indexed memoId, address indexed sender, address indexed recipient, bytes data)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoStoredLog {
    pub memo_id: MemoId,
    pub sender: Address,
    pub recipient: Address,
    /// Encoded memo as submitted to `putMemo`.
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: Option<String>,
}

/// `MemoDeleted(bytes32 indexed memoId, address indexed recipient)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoDeletedLog {
    pub memo_id: MemoId,
    pub recipient: Address,
    pub block_number: u64,
    pub tx_hash: Option<String>,
}

/// Errors from the chain client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Upstream RPC failure. Safe to retry.
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("block {0} not found")]
    BlockNotFound(u64),
}

/// Read access to the chain hosting the memo store contract.
///
/// Block ranges are inclusive on both ends.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current head block number.
    async fn latest_block(&self) -> Result<u64, ChainError>;

    /// Timestamp of `block` in unix seconds.
    async fn block_timestamp(&self, block: u64) -> Result<i64, ChainError>;

    /// `MemoStored` events emitted by `contract` in `[from, to]`.
    async fn memo_stored_logs(
        &self,
        contract: &Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<MemoStoredLog>, ChainError>;

    /// `MemoDeleted` events emitted by `contract` in `[from, to]`.
    async fn memo_deleted_logs(
        &self,
        contract: &Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<MemoDeletedLog>, ChainError>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn latest_block(&self) -> Result<u64, ChainError> {
        (**self).latest_block().await
    }

    async fn block_timestamp(&self, block: u64) -> Result<i64, ChainError> {
        (**self).block_timestamp(block).await
    }

    async fn memo_stored_logs(
        &self,
        contract: &Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<MemoStoredLog>, ChainError> {
        (**self).memo_stored_logs(contract, from, to).await
    }

    async fn memo_deleted_logs(
        &self,
        contract: &Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<MemoDeletedLog>, ChainError> {
        (**self).memo_deleted_logs(contract, from, to).await
    }
}

/// A simulated chain for tests.
///
/// Blocks are numbered from 0. Every emitted event mines a new block.
pub mod memory {
    use super::*;
    use tokio::sync::RwLock;

    /// In-memory chain with event logs and failure injection.
    pub struct MemoryChain {
        inner: RwLock<ChainState>,
    }

    struct ChainState {
        /// Timestamp of each block, indexed by block number.
        timestamps: Vec<i64>,
        /// Seconds between mined blocks.
        block_time: i64,
        stored: Vec<(Address, MemoStoredLog)>,
        deleted: Vec<(Address, MemoDeletedLog)>,
        /// Log queries covering this block fail.
        fail_at: Option<u64>,
        timestamp_probes: usize,
        log_ranges: Vec<(u64, u64)>,
        tx_counter: u64,
    }

    impl MemoryChain {
        /// Create a chain holding only a genesis block at `genesis_timestamp`.
        pub fn new(genesis_timestamp: i64) -> Self {
            Self {
                inner: RwLock::new(ChainState {
                    timestamps: vec![genesis_timestamp],
                    block_time: 1,
                    stored: Vec::new(),
                    deleted: Vec::new(),
                    fail_at: None,
                    timestamp_probes: 0,
                    log_ranges: Vec::new(),
                    tx_counter: 0,
                }),
            }
        }

        /// Set the seconds between subsequently mined blocks.
        pub async fn set_block_time(&self, seconds: i64) {
            self.inner.write().await.block_time = seconds;
        }

        /// Mine `count` empty blocks. Returns the new head.
        pub async fn mine(&self, count: u64) -> u64 {
            let mut state = self.inner.write().await;
            for _ in 0..count {
                state.mine_one();
            }
            state.head()
        }

        /// Mine a block carrying a `MemoStored` event.
        pub async fn emit_stored(
            &self,
            contract: Address,
            memo_id: MemoId,
            sender: Address,
            recipient: Address,
            data: impl Into<Bytes>,
        ) -> MemoStoredLog {
            let mut state = self.inner.write().await;
            let block_number = state.mine_one();
            let log = MemoStoredLog {
                memo_id,
                sender,
                recipient,
                data: data.into(),
                block_number,
                tx_hash: Some(state.next_tx_hash()),
            };
            state.stored.push((contract, log.clone()));
            log
        }

        /// Mine a block carrying a `MemoDeleted` event.
        pub async fn emit_deleted(
            &self,
            contract: Address,
            memo_id: MemoId,
            recipient: Address,
        ) -> MemoDeletedLog {
            let mut state = self.inner.write().await;
            let block_number = state.mine_one();
            let log = MemoDeletedLog {
                memo_id,
                recipient,
                block_number,
                tx_hash: Some(state.next_tx_hash()),
            };
            state.deleted.push((contract, log.clone()));
            log
        }

        /// Make log queries whose range covers `block` fail. `None` clears it.
        pub async fn fail_logs_at(&self, block: Option<u64>) {
            self.inner.write().await.fail_at = block;
        }

        /// Number of `block_timestamp` calls served so far.
        pub async fn timestamp_probes(&self) -> usize {
            self.inner.read().await.timestamp_probes
        }

        /// Every `[from, to]` range passed to a stored-log query.
        pub async fn log_ranges(&self) -> Vec<(u64, u64)> {
            self.inner.read().await.log_ranges.clone()
        }
    }

    impl ChainState {
        fn head(&self) -> u64 {
            (self.timestamps.len() - 1) as u64
        }

        fn mine_one(&mut self) -> u64 {
            let last = self.timestamps.last().copied().unwrap_or_default();
            self.timestamps.push(last + self.block_time);
            self.head()
        }

        fn next_tx_hash(&mut self) -> String {
            self.tx_counter += 1;
            format!("0x{:064x}", self.tx_counter)
        }

        fn check_range(&self, from: u64, to: u64) -> Result<(), ChainError> {
            match self.fail_at {
                Some(block) if (from..=to).contains(&block) => Err(ChainError::Rpc(format!(
                    "injected failure for range {}..={}",
                    from, to
                ))),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ChainClient for MemoryChain {
        async fn latest_block(&self) -> Result<u64, ChainError> {
            Ok(self.inner.read().await.head())
        }

        async fn block_timestamp(&self, block: u64) -> Result<i64, ChainError> {
            let mut state = self.inner.write().await;
            state.timestamp_probes += 1;
            state
                .timestamps
                .get(block as usize)
                .copied()
                .ok_or(ChainError::BlockNotFound(block))
        }

        async fn memo_stored_logs(
            &self,
            contract: &Address,
            from: u64,
            to: u64,
        ) -> Result<Vec<MemoStoredLog>, ChainError> {
            let mut state = self.inner.write().await;
            state.log_ranges.push((from, to));
            state.check_range(from, to)?;
            Ok(state
                .stored
                .iter()
                .filter(|(c, log)| c == contract && (from..=to).contains(&log.block_number))
                .map(|(_, log)| log.clone())
                .collect())
        }

        async fn memo_deleted_logs(
            &self,
            contract: &Address,
            from: u64,
            to: u64,
        ) -> Result<Vec<MemoDeletedLog>, ChainError> {
            let state = self.inner.read().await;
            state.check_range(from, to)?;
            Ok(state
                .deleted
                .iter()
                .filter(|(c, log)| c == contract && (from..=to).contains(&log.block_number))
                .map(|(_, log)| log.clone())
                .collect())
        }
    }

}
