//! The indexer run loop.
//!
//! A run moves through explicit phases:
//!
//! 1. **ResolveStartBlock**: resume after the mode's cursor, or cold start
//! 2. **ScanChunk**: fetch both event kinds for one bounded range and
//!    project them into summaries; repeat until the head is reached
//! 3. **PersistCheckpoint**: record the last scanned block for the mode
//!
//! If the start is already past the head the run goes to **NoNewBlocks**,
//! which records the head as the cursor and stops.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use memo_vault_core::MemoId;
use memo_vault_store::{
    AddressSummary, BlobStore, CheckpointRepository, IndexMode, IndexerCheckpoint, SummaryStore,
};

use crate::chain::{ChainClient, MemoDeletedLog, MemoStoredLog};
use crate::config::IndexerConfig;
use crate::error::Result;

/// Outcome of one indexer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexerReport {
    /// At least one block was scanned.
    Scanned {
        mode: IndexMode,
        from_block: u64,
        to_block: u64,
        /// `MemoStored` events seen, including skipped ones.
        stored: usize,
        /// `MemoDeleted` events seen.
        deleted: usize,
        chunks: usize,
    },
    /// The cursor was already at the head.
    NoNewBlocks { mode: IndexMode, latest_block: u64 },
    /// `maybe_refresh` found a recent enough automatic run.
    Skipped { mode: IndexMode },
}

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    ResolveStartBlock,
    ScanChunk { start: u64 },
    PersistCheckpoint { to_block: u64 },
    NoNewBlocks,
}

#[derive(Debug, Default)]
struct ChunkStats {
    stored: usize,
    deleted: usize,
}

/// Chain indexer over a chain client, a blob store and a checkpoint repository.
pub struct Indexer<C, B, R> {
    chain: C,
    summaries: SummaryStore<B>,
    checkpoints: R,
    config: IndexerConfig,
}

impl<C, B, R> Indexer<C, B, R>
where
    C: ChainClient,
    B: BlobStore,
    R: CheckpointRepository,
{
    pub fn new(chain: C, blobs: B, checkpoints: R, config: IndexerConfig) -> Self {
        Self {
            chain,
            summaries: SummaryStore::new(blobs),
            checkpoints,
            config,
        }
    }

    /// The summary store the indexer writes to.
    pub fn summaries(&self) -> &SummaryStore<B> {
        &self.summaries
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// The currently persisted checkpoint.
    pub async fn checkpoint(&self) -> Result<Option<IndexerCheckpoint>> {
        Ok(self.checkpoints.load().await?)
    }

    /// Scan from the mode's cursor to the chain head.
    pub async fn run(&self, mode: IndexMode) -> Result<IndexerReport> {
        self.run_at(mode, Utc::now()).await
    }

    /// [`Indexer::run`] with an explicit wall clock.
    pub async fn run_at(&self, mode: IndexMode, now: DateTime<Utc>) -> Result<IndexerReport> {
        let latest = self.chain.latest_block().await?;
        let checkpoint = self.checkpoints.load().await?;

        let mut phase = ScanPhase::ResolveStartBlock;
        let mut from_block = 0;
        let mut totals = ChunkStats::default();
        let mut chunks = 0;

        loop {
            phase = match phase {
                ScanPhase::ResolveStartBlock => {
                    let start = self
                        .resolve_start_block(mode, latest, checkpoint.as_ref(), now)
                        .await?;
                    tracing::debug!(%mode, start, latest, "resolved start block");

                    if start > latest {
                        ScanPhase::NoNewBlocks
                    } else {
                        from_block = start;
                        ScanPhase::ScanChunk { start }
                    }
                }

                ScanPhase::ScanChunk { start } => {
                    let span = self.config.max_block_range.max(1) - 1;
                    let end = start.saturating_add(span).min(latest);

                    let stats = self.scan_chunk(start, end).await?;
                    totals.stored += stats.stored;
                    totals.deleted += stats.deleted;
                    chunks += 1;

                    if end >= latest {
                        ScanPhase::PersistCheckpoint { to_block: end }
                    } else {
                        ScanPhase::ScanChunk { start: end + 1 }
                    }
                }

                ScanPhase::PersistCheckpoint { to_block } => {
                    self.persist(mode, to_block, now).await?;
                    tracing::info!(
                        %mode,
                        from_block,
                        to_block,
                        stored = totals.stored,
                        deleted = totals.deleted,
                        chunks,
                        "indexer run complete"
                    );
                    return Ok(IndexerReport::Scanned {
                        mode,
                        from_block,
                        to_block,
                        stored: totals.stored,
                        deleted: totals.deleted,
                        chunks,
                    });
                }

                ScanPhase::NoNewBlocks => {
                    self.persist(mode, latest, now).await?;
                    tracing::debug!(%mode, latest, "no new blocks");
                    return Ok(IndexerReport::NoNewBlocks {
                        mode,
                        latest_block: latest,
                    });
                }
            };
        }
    }

    /// Run an automatic scan unless the last one is younger than the
    /// configured refresh interval.
    pub async fn maybe_refresh(&self) -> Result<IndexerReport> {
        self.maybe_refresh_at(Utc::now()).await
    }

    /// [`Indexer::maybe_refresh`] with an explicit wall clock.
    pub async fn maybe_refresh_at(&self, now: DateTime<Utc>) -> Result<IndexerReport> {
        let last_run = self
            .checkpoints
            .load()
            .await?
            .and_then(|c| c.last_run(IndexMode::Automatic))
            .unwrap_or(0);
        let interval = i64::try_from(self.config.refresh_interval.as_millis()).unwrap_or(i64::MAX);

        if now.timestamp_millis().saturating_sub(last_run) < interval {
            tracing::debug!(last_run, "skipping refresh");
            return Ok(IndexerReport::Skipped {
                mode: IndexMode::Automatic,
            });
        }

        self.run_at(IndexMode::Automatic, now).await
    }

    /// First block a run should scan.
    ///
    /// With a cursor this is the block after it. Without one, automatic runs
    /// start a fixed lookback behind `latest` and manual runs start at the
    /// first block inside the manual window.
    pub async fn resolve_start_block(
        &self,
        mode: IndexMode,
        latest: u64,
        checkpoint: Option<&IndexerCheckpoint>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        if let Some(cursor) = checkpoint.and_then(|c| c.cursor(mode)) {
            return Ok(cursor.saturating_add(1));
        }

        match mode {
            IndexMode::Automatic => Ok(latest.saturating_sub(self.config.initial_lookback)),
            IndexMode::Manual => {
                let window = i64::try_from(self.config.manual_window.as_secs()).unwrap_or(i64::MAX);
                let target = now.timestamp().saturating_sub(window);
                self.find_block_by_timestamp(target, latest).await
            }
        }
    }

    /// Lowest block in `[0, latest]` whose timestamp is at least `target`
    /// (unix seconds), or `latest` if every block is older.
    ///
    /// Block timestamps are non-decreasing, so this is a binary search
    /// costing O(log latest) timestamp lookups.
    pub async fn find_block_by_timestamp(&self, target: i64, latest: u64) -> Result<u64> {
        if target <= 0 {
            return Ok(0);
        }

        let mut low = 0u64;
        let mut high = latest;
        while low < high {
            let mid = low + (high - low) / 2;
            if self.chain.block_timestamp(mid).await? < target {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        Ok(low)
    }

    /// Project the events of `[from, to]` into summaries.
    async fn scan_chunk(&self, from: u64, to: u64) -> Result<ChunkStats> {
        let contract = &self.config.memo_store_address;
        let (stored_logs, deleted_logs) = tokio::try_join!(
            self.chain.memo_stored_logs(contract, from, to),
            self.chain.memo_deleted_logs(contract, from, to),
        )?;

        let deleted_ids: HashSet<MemoId> = deleted_logs.iter().map(|log| log.memo_id).collect();

        // Later events for the same id replace earlier ones
        let mut by_id: HashMap<MemoId, &MemoStoredLog> = HashMap::new();
        for log in &stored_logs {
            by_id.insert(log.memo_id, log);
        }

        try_join_all(
            by_id
                .into_values()
                .filter(|log| !deleted_ids.contains(&log.memo_id))
                .map(|log| self.index_stored(log)),
        )
        .await?;

        try_join_all(deleted_logs.iter().map(|log| self.index_deleted(log))).await?;

        tracing::debug!(
            from,
            to,
            stored = stored_logs.len(),
            deleted = deleted_logs.len(),
            "scanned chunk"
        );

        Ok(ChunkStats {
            stored: stored_logs.len(),
            deleted: deleted_logs.len(),
        })
    }

    /// Write both summaries for one stored memo. Returns whether anything
    /// was written.
    async fn index_stored(&self, log: &MemoStoredLog) -> Result<bool> {
        let memo = match memo_vault_codec::decode(&log.data) {
            Ok(memo) => memo,
            Err(e) => {
                tracing::warn!(
                    memo_id = %log.memo_id,
                    block = log.block_number,
                    error = %e,
                    "skipping undecodable memo"
                );
                return Ok(false);
            }
        };

        if self
            .summaries
            .is_tombstoned(&log.recipient, &log.memo_id)
            .await?
        {
            tracing::debug!(memo_id = %log.memo_id, "memo already deleted, not re-indexing");
            return Ok(false);
        }

        let [sender_view, recipient_view] = AddressSummary::pair(
            log.memo_id,
            log.sender,
            log.recipient,
            memo.token_info(),
            memo.amount_display.clone(),
            memo.created_at,
            log.tx_hash.clone(),
        );
        // A tombstone written after the check above still survives here
        let (_, recipient_written) = tokio::try_join!(
            self.summaries.write_summary(&sender_view),
            self.summaries.write_summary(&recipient_view),
        )?;
        if !recipient_written {
            tracing::debug!(memo_id = %log.memo_id, "memo deleted while indexing");
        }
        Ok(true)
    }

    async fn index_deleted(&self, log: &MemoDeletedLog) -> Result<()> {
        self.summaries
            .write_tombstone(&log.recipient, &log.memo_id)
            .await?;
        Ok(())
    }

    /// Advance the mode's cursor in the stored checkpoint.
    ///
    /// The repository reloads under its own lock, so a concurrent run of
    /// the other mode keeps its fields.
    async fn persist(&self, mode: IndexMode, block: u64, now: DateTime<Utc>) -> Result<()> {
        self.checkpoints
            .record_run(mode, block, now.timestamp_millis())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::memory::MemoryChain;
    use crate::error::IndexerError;
    use memo_vault_codec::{encode, seal, MemoDraft, MemoVersion, SealingParties};
    use memo_vault_core::{Address, IvmsPayload, TokenInfo};
    use memo_vault_crypto::P256SecretKey;
    use memo_vault_store::{
        BlobCheckpointRepository, MemoryStore, SummaryDocument, SummaryRole, CHECKPOINT_KEY,
    };
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    const CONTRACT: Address = Address::from_bytes([0xc0; 20]);
    const GENESIS: i64 = 1_700_000_000;

    type TestIndexer =
        Indexer<Arc<MemoryChain>, Arc<MemoryStore>, BlobCheckpointRepository<Arc<MemoryStore>>>;

    struct Harness {
        chain: Arc<MemoryChain>,
        blobs: Arc<MemoryStore>,
        indexer: TestIndexer,
    }

    fn alice() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn bob() -> Address {
        Address::from_bytes([0xbb; 20])
    }

    /// An hour after genesis, so a manual cold start reaches block 0.
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(GENESIS + 3_600, 0).unwrap()
    }

    fn harness_with(config: IndexerConfig) -> Harness {
        let chain = Arc::new(MemoryChain::new(GENESIS));
        let blobs = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(
            chain.clone(),
            blobs.clone(),
            BlobCheckpointRepository::new(blobs.clone()),
            config,
        );
        Harness {
            chain,
            blobs,
            indexer,
        }
    }

    fn harness() -> Harness {
        harness_with(IndexerConfig::new(CONTRACT))
    }

    fn sealed_memo(reference: &str, version: MemoVersion) -> (MemoId, Vec<u8>) {
        let sender = P256SecretKey::generate();
        let recipient = P256SecretKey::generate();
        let draft = MemoDraft {
            sender: alice(),
            recipient: bob(),
            token: TokenInfo {
                address: Address::from_bytes([0x20; 20]),
                symbol: "AlphaUSD".to_string(),
                decimals: 6,
            },
            amount_display: "25.00".to_string(),
            created_at: DateTime::from_timestamp(GENESIS, 0).unwrap(),
            additional_info: None,
            payload: IvmsPayload::json(json!({ "reference": reference })),
            memo_id: None,
        };
        let parties = SealingParties {
            recipient: recipient.public_key(),
            regulator: None,
        };
        let sealed = seal(&draft, version, &sender, &parties).unwrap();
        (sealed.memo_id, encode(&sealed.memo).unwrap())
    }

    async fn store_memo(h: &Harness, reference: &str) -> MemoId {
        let (memo_id, bytes) = sealed_memo(reference, MemoVersion::V2);
        h.chain
            .emit_stored(CONTRACT, memo_id, alice(), bob(), bytes)
            .await;
        memo_id
    }

    async fn summary_state(h: &Harness) -> BTreeMap<String, Vec<u8>> {
        let mut state = h.blobs.snapshot().await;
        state.remove(CHECKPOINT_KEY);
        state
    }

    /// Blob store that pauses the first read of one key until released.
    struct GatedStore {
        inner: Arc<MemoryStore>,
        key: String,
        fired: AtomicBool,
        reached: Notify,
        release: Notify,
    }

    impl GatedStore {
        fn new(inner: Arc<MemoryStore>, key: String) -> Self {
            Self {
                inner,
                key,
                fired: AtomicBool::new(false),
                reached: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl BlobStore for GatedStore {
        async fn put(&self, key: &str, value: &[u8]) -> memo_vault_store::Result<()> {
            self.inner.put(key, value).await
        }

        async fn put_unless_contains(
            &self,
            key: &str,
            value: &[u8],
            marker: &[u8],
        ) -> memo_vault_store::Result<bool> {
            self.inner.put_unless_contains(key, value, marker).await
        }

        async fn get(&self, key: &str) -> memo_vault_store::Result<Option<Vec<u8>>> {
            let value = self.inner.get(key).await?;
            if key == self.key && !self.fired.swap(true, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            Ok(value)
        }

        async fn list(&self, prefix: &str) -> memo_vault_store::Result<Vec<String>> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, key: &str) -> memo_vault_store::Result<bool> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_cold_start_indexes_both_namespaces() {
        let h = harness();
        h.chain.mine(5).await;
        let memo_id = store_memo(&h, "INV-1").await;
        let head = h.chain.mine(2).await;

        let report = h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        assert_eq!(
            report,
            IndexerReport::Scanned {
                mode: IndexMode::Automatic,
                from_block: 0,
                to_block: head,
                stored: 1,
                deleted: 0,
                chunks: 1,
            }
        );

        let for_alice = h.indexer.summaries().list_for(&alice()).await.unwrap();
        let for_bob = h.indexer.summaries().list_for(&bob()).await.unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].memo_id, memo_id);
        assert_eq!(for_alice[0].role, SummaryRole::Sender);
        assert_eq!(for_alice[0].counterparty, bob());
        assert_eq!(for_bob[0].role, SummaryRole::Recipient);
        assert_eq!(for_bob[0].counterparty, alice());
        assert!(for_bob[0].tx_hash.is_some());

        let checkpoint = h.indexer.checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.cursor(IndexMode::Automatic), Some(head));
        assert_eq!(
            checkpoint.last_run(IndexMode::Automatic),
            Some(now().timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_token_metadata_by_version() {
        let h = harness();
        let (v1_id, v1_bytes) = sealed_memo("v1", MemoVersion::V1);
        let (v2_id, v2_bytes) = sealed_memo("v2", MemoVersion::V2);
        h.chain.emit_stored(CONTRACT, v1_id, alice(), bob(), v1_bytes).await;
        h.chain.emit_stored(CONTRACT, v2_id, alice(), bob(), v2_bytes).await;

        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();

        let summaries = h.indexer.summaries();
        let v1 = summaries.read(&alice(), &v1_id).await.unwrap().unwrap();
        let v2 = summaries.read(&alice(), &v2_id).await.unwrap().unwrap();
        match (v1, v2) {
            (SummaryDocument::Live(v1), SummaryDocument::Live(v2)) => {
                assert_eq!(v1.token.symbol, "AlphaUSD");
                assert_eq!(v2.token, TokenInfo::unknown(Address::from_bytes([0x20; 20])));
                assert_eq!(v2.amount_display, "25.00");
            }
            other => panic!("expected live summaries, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookback_is_floored_at_head_minus_lookback() {
        let h = harness();
        let head = h.chain.mine(3_000).await;

        match h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap() {
            IndexerReport::Scanned { from_block, .. } => assert_eq!(from_block, head - 2_000),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resumes_after_cursor() {
        let h = harness();
        store_memo(&h, "first").await;
        let first_head = h.chain.mine(1).await;
        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();

        store_memo(&h, "second").await;
        let report = h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();

        match report {
            IndexerReport::Scanned {
                from_block, stored, ..
            } => {
                assert_eq!(from_block, first_head + 1);
                assert_eq!(stored, 1);
            }
            other => panic!("unexpected report {:?}", other),
        }
        assert_eq!(h.indexer.summaries().list_for(&bob()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_new_blocks_records_head() {
        let h = harness();
        let head = h.chain.mine(4).await;
        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();

        let later = now() + chrono::Duration::seconds(30);
        let report = h.indexer.run_at(IndexMode::Automatic, later).await.unwrap();
        assert_eq!(
            report,
            IndexerReport::NoNewBlocks {
                mode: IndexMode::Automatic,
                latest_block: head,
            }
        );

        let checkpoint = h.indexer.checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.cursor(IndexMode::Automatic), Some(head));
        assert_eq!(
            checkpoint.last_run(IndexMode::Automatic),
            Some(later.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_chunks_are_bounded() {
        let h = harness_with(IndexerConfig {
            max_block_range: 4,
            ..IndexerConfig::new(CONTRACT)
        });
        h.chain.mine(10).await;

        let report = h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        assert!(matches!(report, IndexerReport::Scanned { chunks: 3, .. }));
        assert_eq!(h.chain.log_ranges().await, vec![(0, 3), (4, 7), (8, 10)]);
    }

    #[tokio::test]
    async fn test_deletion_in_same_chunk_suppresses_summaries() {
        let h = harness();
        let memo_id = store_memo(&h, "gone").await;
        h.chain.emit_deleted(CONTRACT, memo_id, bob()).await;

        let report = h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        assert!(matches!(
            report,
            IndexerReport::Scanned {
                stored: 1,
                deleted: 1,
                ..
            }
        ));

        let summaries = h.indexer.summaries();
        assert!(summaries.list_for(&bob()).await.unwrap().is_empty());
        assert!(summaries.list_for(&alice()).await.unwrap().is_empty());
        assert!(summaries.is_tombstoned(&bob(), &memo_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_deletion_in_later_run_wins() {
        let h = harness();
        let memo_id = store_memo(&h, "later").await;
        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        assert_eq!(h.indexer.summaries().list_for(&bob()).await.unwrap().len(), 1);

        h.chain.emit_deleted(CONTRACT, memo_id, bob()).await;
        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();

        let summaries = h.indexer.summaries();
        assert!(summaries.list_for(&bob()).await.unwrap().is_empty());
        assert_eq!(summaries.list_for(&alice()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_does_not_resurrect_deleted_memo() {
        // One block per chunk puts the store and the delete in separate chunks
        let h = harness_with(IndexerConfig {
            max_block_range: 1,
            ..IndexerConfig::new(CONTRACT)
        });
        let memo_id = store_memo(&h, "replayed").await;
        h.chain.emit_deleted(CONTRACT, memo_id, bob()).await;

        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        assert!(h.indexer.summaries().is_tombstoned(&bob(), &memo_id).await.unwrap());

        // Manual cold start replays the same blocks
        h.indexer.run_at(IndexMode::Manual, now()).await.unwrap();
        assert!(h.indexer.summaries().is_tombstoned(&bob(), &memo_id).await.unwrap());
        assert!(h.indexer.summaries().list_for(&bob()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_during_replay_is_kept() {
        let chain = Arc::new(MemoryChain::new(GENESIS));
        let (memo_id, bytes) = sealed_memo("raced", MemoVersion::V2);
        chain
            .emit_stored(CONTRACT, memo_id, alice(), bob(), bytes)
            .await;

        let blobs = Arc::new(MemoryStore::new());
        let gated = Arc::new(GatedStore::new(
            blobs.clone(),
            SummaryStore::<MemoryStore>::key_for(&bob(), &memo_id),
        ));
        let indexer = Indexer::new(
            chain.clone(),
            gated.clone(),
            BlobCheckpointRepository::new(gated.clone()),
            IndexerConfig::new(CONTRACT),
        );
        let other_run = SummaryStore::new(blobs.clone());

        // The manual run sees no tombstone, then the deletion lands before it writes
        let (report, ()) = tokio::join!(indexer.run_at(IndexMode::Manual, now()), async {
            gated.reached.notified().await;
            other_run.write_tombstone(&bob(), &memo_id).await.unwrap();
            gated.release.notify_one();
        });
        report.unwrap();

        assert!(other_run.is_tombstoned(&bob(), &memo_id).await.unwrap());
        assert!(other_run.list_for(&bob()).await.unwrap().is_empty());
        assert_eq!(other_run.list_for(&alice()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replaying_range_is_idempotent() {
        let h = harness();
        store_memo(&h, "a").await;
        let deleted = store_memo(&h, "b").await;
        store_memo(&h, "c").await;
        h.chain.emit_deleted(CONTRACT, deleted, bob()).await;

        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        let first = summary_state(&h).await;

        h.indexer.run_at(IndexMode::Manual, now()).await.unwrap();
        assert_eq!(summary_state(&h).await, first);
    }

    #[tokio::test]
    async fn test_undecodable_memo_is_skipped() {
        let h = harness();
        h.chain
            .emit_stored(CONTRACT, MemoId::from_bytes([9; 32]), alice(), bob(), b"not json".to_vec())
            .await;
        store_memo(&h, "good").await;

        let report = h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        assert!(matches!(report, IndexerReport::Scanned { stored: 2, .. }));
        assert_eq!(h.indexer.summaries().list_for(&alice()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_run_saves_no_checkpoint() {
        let h = harness_with(IndexerConfig {
            max_block_range: 2,
            ..IndexerConfig::new(CONTRACT)
        });
        h.chain.mine(6).await;
        h.chain.fail_logs_at(Some(5)).await;

        let err = h
            .indexer
            .run_at(IndexMode::Automatic, now())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::Chain(_)));
        assert!(err.is_transient());
        assert!(h.indexer.checkpoint().await.unwrap().is_none());

        h.chain.fail_logs_at(None).await;
        match h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap() {
            IndexerReport::Scanned { from_block, .. } => assert_eq!(from_block, 0),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_modes_keep_separate_cursors() {
        let h = harness();
        let head = h.chain.mine(3).await;
        h.indexer.run_at(IndexMode::Manual, now()).await.unwrap();

        let checkpoint = h.indexer.checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.cursor(IndexMode::Manual), Some(head));
        assert_eq!(checkpoint.cursor(IndexMode::Automatic), None);

        h.chain.mine(2).await;
        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();
        let checkpoint = h.indexer.checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.cursor(IndexMode::Manual), Some(head));
        assert_eq!(checkpoint.cursor(IndexMode::Automatic), Some(head + 2));
    }

    #[tokio::test]
    async fn test_manual_cold_start_finds_window_start() {
        let h = harness();
        h.chain.set_block_time(600).await;
        let head = h.chain.mine(300).await;
        let now = DateTime::from_timestamp(GENESIS + 600 * 300, 0).unwrap();

        let report = h.indexer.run_at(IndexMode::Manual, now).await.unwrap();
        match report {
            // (300 * 600 - 86_400) / 600
            IndexerReport::Scanned {
                from_block,
                to_block,
                ..
            } => {
                assert_eq!(from_block, 156);
                assert_eq!(to_block, head);
            }
            other => panic!("unexpected report {:?}", other),
        }
        assert!(h.chain.timestamp_probes().await <= 10);
    }

    #[tokio::test]
    async fn test_manual_window_before_genesis_starts_at_zero() {
        let h = harness_with(IndexerConfig {
            manual_window: Duration::from_secs(u64::MAX / 2),
            ..IndexerConfig::new(CONTRACT)
        });
        h.chain.mine(5).await;

        let start = h
            .indexer
            .resolve_start_block(IndexMode::Manual, 5, None, now())
            .await
            .unwrap();
        assert_eq!(start, 0);
        assert_eq!(h.chain.timestamp_probes().await, 0);
    }

    #[tokio::test]
    async fn test_maybe_refresh_respects_interval() {
        let h = harness();
        h.chain.mine(2).await;
        h.indexer.run_at(IndexMode::Automatic, now()).await.unwrap();

        let soon = now() + chrono::Duration::seconds(60);
        assert_eq!(
            h.indexer.maybe_refresh_at(soon).await.unwrap(),
            IndexerReport::Skipped {
                mode: IndexMode::Automatic
            }
        );

        store_memo(&h, "fresh").await;
        let later = now() + chrono::Duration::seconds(121);
        assert!(matches!(
            h.indexer.maybe_refresh_at(later).await.unwrap(),
            IndexerReport::Scanned { stored: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_manual_run_does_not_count_as_refresh() {
        let h = harness();
        h.chain.mine(2).await;
        h.indexer.run_at(IndexMode::Manual, now()).await.unwrap();

        let report = h.indexer.maybe_refresh_at(now()).await.unwrap();
        assert!(matches!(report, IndexerReport::Scanned { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_binary_search_matches_linear_scan(
            gaps in proptest::collection::vec(0i64..50, 1..60),
            offset in 0i64..3_000,
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let h = harness();
                let mut timestamps = vec![GENESIS];
                for gap in &gaps {
                    h.chain.set_block_time(*gap).await;
                    h.chain.mine(1).await;
                    timestamps.push(timestamps.last().unwrap() + gap);
                }
                let latest = gaps.len() as u64;
                let target = GENESIS + offset;

                let expected = timestamps
                    .iter()
                    .position(|ts| *ts >= target)
                    .map(|i| i as u64)
                    .unwrap_or(latest);
                let found = h.indexer.find_block_by_timestamp(target, latest).await.unwrap();
                assert_eq!(found, expected);
            });
        }
    }
}
