//! Off-chain memos: plaintext IVMS records stored by content hash.
//!
//! The submitter supplies the memo id it committed to elsewhere (for
//! example in a transfer's memo field); the record is accepted only if the
//! id is the hash of the payload's canonical form.

use chrono::{DateTime, Utc};
use memo_vault_core::{
    canonicalize_serializable, is_valid_memo_id, verify_memo_id, Address, IvmsPayload, MemoId,
    TokenInfo, ValidationError,
};
use memo_vault_store::{BlobStore, MemoRecord, MemoRecordStore};

use crate::error::{MemoError, Result};

/// An off-chain memo as submitted by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct OffchainSubmission {
    /// Textual memo id; must be `0x` plus 64 lowercase hex digits.
    pub memo_id: String,
    pub sender: Address,
    pub recipient: Address,
    pub token: TokenInfo,
    pub amount_base: String,
    pub amount_display: String,
    pub tx_hash: Option<String>,
    pub ivms: IvmsPayload,
}

/// Off-chain memo service over a blob store.
pub struct OffchainMemos<B> {
    records: MemoRecordStore<B>,
}

impl<B: BlobStore> OffchainMemos<B> {
    pub fn new(blobs: B) -> Self {
        Self {
            records: MemoRecordStore::new(blobs),
        }
    }

    /// Validate and store a submission.
    pub async fn submit(&self, submission: OffchainSubmission) -> Result<MemoRecord> {
        self.submit_at(submission, Utc::now()).await
    }

    /// [`OffchainMemos::submit`] with an explicit creation time.
    pub async fn submit_at(
        &self,
        submission: OffchainSubmission,
        now: DateTime<Utc>,
    ) -> Result<MemoRecord> {
        if !is_valid_memo_id(&submission.memo_id) {
            return Err(ValidationError::InvalidMemoId(submission.memo_id).into());
        }
        let memo_id = MemoId::from_hex(&submission.memo_id)?;

        let canonical = canonicalize_serializable(&submission.ivms)?;
        verify_memo_id(&memo_id, &canonical)?;

        let record = MemoRecord {
            memo_id,
            sender: submission.sender,
            recipient: submission.recipient,
            token: submission.token,
            amount_base: submission.amount_base,
            amount_display: submission.amount_display,
            tx_hash: submission.tx_hash,
            ivms: submission.ivms,
            ivms_canonical: canonical,
            created_at: now,
        };
        self.records.put(&record).await?;

        tracing::info!(%memo_id, "off-chain memo stored");
        Ok(record)
    }

    /// Load a record on behalf of `address`.
    ///
    /// The caller is expected to have already verified that `address`
    /// signed the access message for this memo.
    pub async fn verify(&self, memo_id: &MemoId, address: Address) -> Result<MemoRecord> {
        let record = self
            .records
            .get(memo_id)
            .await?
            .ok_or(MemoError::NotFound(*memo_id))?;

        if record.sender != address && record.recipient != address {
            return Err(MemoError::NotAuthorized(format!(
                "{} is not a party to memo {}",
                address, memo_id
            )));
        }
        Ok(record)
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<MemoRecord>> {
        Ok(self.records.list().await?)
    }
}
