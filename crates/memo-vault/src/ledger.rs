//! Contract surface consumed by the vault.
//!
//! [`MemoLedger`] mirrors the memo store contract (`putMemo`, `deleteMemo`,
//! `getMemo`) and [`KeyRegistry`] the public key registry (`setKey`,
//! `getKey`). Production implementations wrap an RPC client; the in-memory
//! versions here emit events into a [`MemoryChain`] so the indexer can
//! consume them in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use memo_vault_core::{Address, MemoId, MAX_MEMO_BYTES};
use memo_vault_crypto::{CryptoError, P256PublicKey, KEY_TYPE_P256};
use memo_vault_indexer::{ChainClient, ChainError, MemoryChain};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by the contracts or their transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("rpc error: {0}")]
    Rpc(String),

    /// `putMemo` reverted on the byte ceiling.
    #[error("memo of {size} bytes exceeds the {limit} byte ceiling")]
    MemoTooLarge { size: usize, limit: usize },

    #[error("memo {0} already stored")]
    MemoExists(MemoId),

    #[error("memo {0} not found")]
    MemoNotFound(MemoId),

    /// `deleteMemo` reverted because the caller is not the recipient.
    #[error("{caller} is not the recipient of memo {memo_id}")]
    NotRecipient { memo_id: MemoId, caller: Address },
}

impl From<ChainError> for LedgerError {
    fn from(e: ChainError) -> Self {
        LedgerError::Rpc(e.to_string())
    }
}

/// A memo as returned by `getMemo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerMemo {
    pub data: Bytes,
    pub sender: Address,
    pub recipient: Address,
    /// Block timestamp of the `putMemo` call, unix seconds.
    pub created_at: u64,
}

/// A registry entry as returned by `getKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredKey {
    pub public_key: Vec<u8>,
    pub key_type: u8,
    pub version: u32,
}

impl RegisteredKey {
    /// Parse the entry as a P-256 public key.
    pub fn p256(&self) -> Result<P256PublicKey, CryptoError> {
        if self.key_type != KEY_TYPE_P256 {
            return Err(CryptoError::InvalidPublicKey(format!(
                "unsupported key type {}",
                self.key_type
            )));
        }
        P256PublicKey::from_sec1_bytes(&self.public_key)
    }
}

/// The memo store contract.
#[async_trait]
pub trait MemoLedger: Send + Sync {
    /// Store `data` under `memo_id`. Returns the transaction hash.
    async fn put_memo(
        &self,
        memo_id: MemoId,
        data: Bytes,
        sender: Address,
        recipient: Address,
    ) -> Result<String, LedgerError>;

    /// Remove a memo. Only its recipient may call this.
    async fn delete_memo(&self, memo_id: MemoId, caller: Address) -> Result<String, LedgerError>;

    async fn get_memo(&self, memo_id: &MemoId) -> Result<Option<LedgerMemo>, LedgerError>;
}

/// The public key registry contract.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Publish `owner`'s public key, replacing any previous entry.
    async fn set_key(
        &self,
        owner: Address,
        public_key: Vec<u8>,
        key_type: u8,
        version: u32,
    ) -> Result<(), LedgerError>;

    async fn get_key(&self, owner: &Address) -> Result<Option<RegisteredKey>, LedgerError>;
}

#[async_trait]
impl<T: MemoLedger + ?Sized> MemoLedger for Arc<T> {
    async fn put_memo(
        &self,
        memo_id: MemoId,
        data: Bytes,
        sender: Address,
        recipient: Address,
    ) -> Result<String, LedgerError> {
        (**self).put_memo(memo_id, data, sender, recipient).await
    }

    async fn delete_memo(&self, memo_id: MemoId, caller: Address) -> Result<String, LedgerError> {
        (**self).delete_memo(memo_id, caller).await
    }

    async fn get_memo(&self, memo_id: &MemoId) -> Result<Option<LedgerMemo>, LedgerError> {
        (**self).get_memo(memo_id).await
    }
}

#[async_trait]
impl<T: KeyRegistry + ?Sized> KeyRegistry for Arc<T> {
    async fn set_key(
        &self,
        owner: Address,
        public_key: Vec<u8>,
        key_type: u8,
        version: u32,
    ) -> Result<(), LedgerError> {
        (**self).set_key(owner, public_key, key_type, version).await
    }

    async fn get_key(&self, owner: &Address) -> Result<Option<RegisteredKey>, LedgerError> {
        (**self).get_key(owner).await
    }
}

/// In-memory memo store contract backed by a simulated chain.
pub struct MemoryLedger {
    chain: Arc<MemoryChain>,
    contract: Address,
    memos: RwLock<HashMap<MemoId, LedgerMemo>>,
}

impl MemoryLedger {
    /// A contract at `contract` emitting its events into `chain`.
    pub fn new(chain: Arc<MemoryChain>, contract: Address) -> Self {
        Self {
            chain,
            contract,
            memos: RwLock::new(HashMap::new()),
        }
    }

    pub fn chain(&self) -> &Arc<MemoryChain> {
        &self.chain
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Number of stored memos.
    pub async fn len(&self) -> usize {
        self.memos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.memos.read().await.is_empty()
    }
}

#[async_trait]
impl MemoLedger for MemoryLedger {
    async fn put_memo(
        &self,
        memo_id: MemoId,
        data: Bytes,
        sender: Address,
        recipient: Address,
    ) -> Result<String, LedgerError> {
        if data.len() > MAX_MEMO_BYTES {
            return Err(LedgerError::MemoTooLarge {
                size: data.len(),
                limit: MAX_MEMO_BYTES,
            });
        }

        let mut memos = self.memos.write().await;
        if memos.contains_key(&memo_id) {
            return Err(LedgerError::MemoExists(memo_id));
        }

        let log = self
            .chain
            .emit_stored(self.contract, memo_id, sender, recipient, data.clone())
            .await;
        let created_at = self.chain.block_timestamp(log.block_number).await?;

        memos.insert(
            memo_id,
            LedgerMemo {
                data,
                sender,
                recipient,
                created_at: u64::try_from(created_at).unwrap_or_default(),
            },
        );
        Ok(log.tx_hash.unwrap_or_default())
    }

    async fn delete_memo(&self, memo_id: MemoId, caller: Address) -> Result<String, LedgerError> {
        let mut memos = self.memos.write().await;
        let recipient = memos
            .get(&memo_id)
            .map(|memo| memo.recipient)
            .ok_or(LedgerError::MemoNotFound(memo_id))?;
        if recipient != caller {
            return Err(LedgerError::NotRecipient { memo_id, caller });
        }

        memos.remove(&memo_id);
        let log = self
            .chain
            .emit_deleted(self.contract, memo_id, recipient)
            .await;
        Ok(log.tx_hash.unwrap_or_default())
    }

    async fn get_memo(&self, memo_id: &MemoId) -> Result<Option<LedgerMemo>, LedgerError> {
        Ok(self.memos.read().await.get(memo_id).cloned())
    }
}

/// In-memory key registry contract.
#[derive(Default)]
pub struct MemoryKeyRegistry {
    keys: RwLock<HashMap<Address, RegisteredKey>>,
}

impl MemoryKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyRegistry for MemoryKeyRegistry {
    async fn set_key(
        &self,
        owner: Address,
        public_key: Vec<u8>,
        key_type: u8,
        version: u32,
    ) -> Result<(), LedgerError> {
        self.keys.write().await.insert(
            owner,
            RegisteredKey {
                public_key,
                key_type,
                version,
            },
        );
        Ok(())
    }

    async fn get_key(&self, owner: &Address) -> Result<Option<RegisteredKey>, LedgerError> {
        Ok(self.keys.read().await.get(owner).cloned())
    }
}
