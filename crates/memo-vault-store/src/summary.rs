//! Per-address memo summaries.
//!
//! Every indexed memo is projected twice: once into the sender's namespace
//! and once into the recipient's. A deletion replaces the recipient's copy
//! with a tombstone. Listing hides tombstones.

use chrono::{DateTime, Utc};
use memo_vault_core::{Address, MemoId, TokenInfo};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::{BlobStore, BlobStoreExt};

/// Key prefix shared by all address namespaces.
pub const SUMMARY_PREFIX: &str = "memos/by-address/";

/// Byte pattern present in every serialized tombstone and in no live summary.
const TOMBSTONE_MARKER: &[u8] = br#""deleted":true"#;

/// Which side of the transfer the namespace owner was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryRole {
    Sender,
    Recipient,
}

/// Where a summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Onchain,
}

/// One memo as seen from one party's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub memo_id: MemoId,
    pub sender: Address,
    pub recipient: Address,
    pub role: SummaryRole,
    pub counterparty: Address,
    pub token: TokenInfo,
    pub amount_display: String,
    pub created_at: DateTime<Utc>,
    pub source: SummarySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl AddressSummary {
    /// Build the sender view and the recipient view of one memo.
    ///
    /// The first element belongs in the sender's namespace, the second in
    /// the recipient's.
    pub fn pair(
        memo_id: MemoId,
        sender: Address,
        recipient: Address,
        token: TokenInfo,
        amount_display: String,
        created_at: DateTime<Utc>,
        tx_hash: Option<String>,
    ) -> [AddressSummary; 2] {
        let sender_view = AddressSummary {
            memo_id,
            sender,
            recipient,
            role: SummaryRole::Sender,
            counterparty: recipient,
            token,
            amount_display,
            created_at,
            source: SummarySource::Onchain,
            tx_hash,
        };
        let recipient_view = AddressSummary {
            role: SummaryRole::Recipient,
            counterparty: sender,
            ..sender_view.clone()
        };
        [sender_view, recipient_view]
    }

    /// The address whose namespace this summary lives in.
    pub fn owner(&self) -> Address {
        match self.role {
            SummaryRole::Sender => self.sender,
            SummaryRole::Recipient => self.recipient,
        }
    }
}

/// Marker left in the recipient's namespace after a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub memo_id: MemoId,
    pub deleted: bool,
}

impl Tombstone {
    pub fn new(memo_id: MemoId) -> Self {
        Self {
            memo_id,
            deleted: true,
        }
    }
}

/// Anything that can sit under a summary key.
///
/// Tombstones are tried first: a live summary never carries `deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryDocument {
    Tombstone(Tombstone),
    Live(AddressSummary),
}

impl SummaryDocument {
    pub fn memo_id(&self) -> MemoId {
        match self {
            SummaryDocument::Tombstone(t) => t.memo_id,
            SummaryDocument::Live(s) => s.memo_id,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, SummaryDocument::Tombstone(t) if t.deleted)
    }
}

/// Summary repository over a blob store.
pub struct SummaryStore<B> {
    blobs: B,
}

impl<B: BlobStore> SummaryStore<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    /// The underlying blob store.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Namespace prefix for `address`. Always lowercase.
    pub fn prefix_for(address: &Address) -> String {
        format!("{}{}/", SUMMARY_PREFIX, address.to_hex())
    }

    /// Full key for one memo in one namespace.
    pub fn key_for(address: &Address, memo_id: &MemoId) -> String {
        format!("{}{}.json", Self::prefix_for(address), memo_id.to_hex())
    }

    /// Write a live summary into its owner's namespace.
    ///
    /// A tombstone already under the key is kept. The check and the write
    /// are one store operation, so a deletion recorded concurrently always
    /// wins. Returns whether the summary was written.
    pub async fn write_summary(&self, summary: &AddressSummary) -> Result<bool> {
        let key = Self::key_for(&summary.owner(), &summary.memo_id);
        let bytes = serde_json::to_vec(&SummaryDocument::Live(summary.clone()))?;
        self.blobs
            .put_unless_contains(&key, &bytes, TOMBSTONE_MARKER)
            .await
    }

    /// Overwrite the recipient's summary with a tombstone.
    pub async fn write_tombstone(&self, recipient: &Address, memo_id: &MemoId) -> Result<()> {
        let key = Self::key_for(recipient, memo_id);
        self.blobs
            .put_json(&key, &SummaryDocument::Tombstone(Tombstone::new(*memo_id)))
            .await
    }

    /// Read whatever is stored for (`address`, `memo_id`).
    pub async fn read(
        &self,
        address: &Address,
        memo_id: &MemoId,
    ) -> Result<Option<SummaryDocument>> {
        self.blobs.get_json(&Self::key_for(address, memo_id)).await
    }

    /// Whether `address` holds a tombstone for `memo_id`.
    pub async fn is_tombstoned(&self, address: &Address, memo_id: &MemoId) -> Result<bool> {
        Ok(self
            .read(address, memo_id)
            .await?
            .map(|doc| doc.is_tombstone())
            .unwrap_or(false))
    }

    /// Live summaries for `address`, newest first.
    ///
    /// Documents that fail to parse are skipped.
    pub async fn list_for(&self, address: &Address) -> Result<Vec<AddressSummary>> {
        let keys = self.blobs.list(&Self::prefix_for(address)).await?;
        let mut summaries = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(bytes) = self.blobs.get(&key).await? else {
                continue;
            };
            match serde_json::from_slice::<SummaryDocument>(&bytes) {
                Ok(SummaryDocument::Live(summary)) => summaries.push(summary),
                Ok(SummaryDocument::Tombstone(_)) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unreadable summary");
                }
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
