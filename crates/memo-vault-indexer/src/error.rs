//! Error types for the indexer.

use thiserror::Error;

use crate::chain::ChainError;
use crate::config::ConfigError;

/// Errors that abort an indexer run.
///
/// A run that returns any of these has not saved a checkpoint.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Upstream chain failure; the run can be retried.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Summary or checkpoint persistence failed.
    #[error("store error: {0}")]
    Store(#[from] memo_vault_store::StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl IndexerError {
    /// Whether retrying the run may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(self, IndexerError::Chain(ChainError::Rpc(_)))
    }
}

/// Result type for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;
