//! Indexer checkpoint persistence.
//!
//! Automatic and manually triggered runs keep independent cursors in the
//! same document, so one mode never moves the other's position.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::traits::{BlobStore, BlobStoreExt};

/// Key of the checkpoint document.
pub const CHECKPOINT_KEY: &str = "memos/onchain-indexer/state.json";

/// How an indexer run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Periodic refresh with a short cold-start lookback.
    #[serde(rename = "auto")]
    Automatic,
    /// Operator-triggered run that backfills the last day on cold start.
    Manual,
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexMode::Automatic => write!(f, "auto"),
            IndexMode::Manual => write!(f, "manual"),
        }
    }
}

/// Persisted indexer position. Run times are unix milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerCheckpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_manual_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_manual_run: Option<i64>,
}

impl IndexerCheckpoint {
    /// Last fully indexed block for `mode`.
    pub fn cursor(&self, mode: IndexMode) -> Option<u64> {
        match mode {
            IndexMode::Automatic => self.last_block,
            IndexMode::Manual => self.last_manual_block,
        }
    }

    /// When `mode` last completed a run.
    pub fn last_run(&self, mode: IndexMode) -> Option<i64> {
        match mode {
            IndexMode::Automatic => self.last_run,
            IndexMode::Manual => self.last_manual_run,
        }
    }

    /// Record a completed run for `mode`.
    ///
    /// The cursor never moves backwards; the other mode's fields are left
    /// untouched.
    pub fn advance(&mut self, mode: IndexMode, block: u64, run_at_ms: i64) {
        let (cursor, last_run) = match mode {
            IndexMode::Automatic => (&mut self.last_block, &mut self.last_run),
            IndexMode::Manual => (&mut self.last_manual_block, &mut self.last_manual_run),
        };
        *cursor = Some(cursor.map_or(block, |existing| existing.max(block)));
        *last_run = Some(run_at_ms);
    }
}

/// Load and save the indexer checkpoint.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn load(&self) -> Result<Option<IndexerCheckpoint>>;

    async fn save(&self, checkpoint: &IndexerCheckpoint) -> Result<()>;

    /// Load, advance `mode` and save, as one step against other callers of
    /// this repository. Returns the saved checkpoint.
    async fn record_run(
        &self,
        mode: IndexMode,
        block: u64,
        run_at_ms: i64,
    ) -> Result<IndexerCheckpoint>;
}

/// Checkpoint stored as a JSON document at [`CHECKPOINT_KEY`].
///
/// Share one repository between concurrent runs: `record_run` is only
/// serialized within a single instance.
pub struct BlobCheckpointRepository<B> {
    blobs: B,
    update: Mutex<()>,
}

impl<B: BlobStore> BlobCheckpointRepository<B> {
    pub fn new(blobs: B) -> Self {
        Self {
            blobs,
            update: Mutex::new(()),
        }
    }
}

#[async_trait]
impl<B: BlobStore> CheckpointRepository for BlobCheckpointRepository<B> {
    async fn load(&self) -> Result<Option<IndexerCheckpoint>> {
        self.blobs.get_json(CHECKPOINT_KEY).await
    }

    async fn save(&self, checkpoint: &IndexerCheckpoint) -> Result<()> {
        self.blobs.put_json(CHECKPOINT_KEY, checkpoint).await
    }

    async fn record_run(
        &self,
        mode: IndexMode,
        block: u64,
        run_at_ms: i64,
    ) -> Result<IndexerCheckpoint> {
        let _guard = self.update.lock().await;
        let mut checkpoint = self.load().await?.unwrap_or_default();
        checkpoint.advance(mode, block, run_at_ms);
        self.save(&checkpoint).await?;
        Ok(checkpoint)
    }
}
