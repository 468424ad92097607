//! Off-chain memo records.
//!
//! A record keeps the plaintext IVMS payload next to its canonical form so
//! a reader can recompute the memo id without trusting the store.

use chrono::{DateTime, Utc};
use memo_vault_core::{Address, IvmsPayload, MemoId, TokenInfo};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::{BlobStore, BlobStoreExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoRecord {
    pub memo_id: MemoId,
    pub sender: Address,
    pub recipient: Address,
    pub token: TokenInfo,
    /// Amount in the token's smallest unit, as a decimal string.
    pub amount_base: String,
    pub amount_display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub ivms: IvmsPayload,
    pub ivms_canonical: String,
    pub created_at: DateTime<Utc>,
}

const RECORD_SUFFIX: &str = "/record.json";

/// Record repository over a blob store.
pub struct MemoRecordStore<B> {
    blobs: B,
}

impl<B: BlobStore> MemoRecordStore<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    pub fn key_for(memo_id: &MemoId) -> String {
        format!("memos/{}{}", memo_id.to_hex(), RECORD_SUFFIX)
    }

    /// Store `record`, replacing any record with the same id.
    pub async fn put(&self, record: &MemoRecord) -> Result<()> {
        self.blobs
            .put_json(&Self::key_for(&record.memo_id), record)
            .await
    }

    pub async fn get(&self, memo_id: &MemoId) -> Result<Option<MemoRecord>> {
        self.blobs.get_json(&Self::key_for(memo_id)).await
    }

    /// Every stored record, newest first. Unreadable documents are skipped.
    pub async fn list(&self) -> Result<Vec<MemoRecord>> {
        let mut records = Vec::new();
        for key in self.blobs.list("memos/").await? {
            if !key.ends_with(RECORD_SUFFIX) {
                continue;
            }
            match self.blobs.get_json::<MemoRecord>(&key).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable record"),
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
