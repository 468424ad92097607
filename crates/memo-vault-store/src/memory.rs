//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use memo_vault_core::Address;
use memo_vault_crypto::StoredKey;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::{BlobStore, KeyStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Blobs, ordered so prefix listing is a range scan.
    blobs: BTreeMap<String, Vec<u8>>,

    /// Local keys by address.
    keys: HashMap<Address, StoredKey>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.blobs.len()
    }

    /// Whether no blobs are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.blobs.is_empty()
    }

    /// Copy of every blob, for comparing whole-store state in tests.
    pub async fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.inner.read().await.blobs.clone()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.blobs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn put_unless_contains(&self, key: &str, value: &[u8], marker: &[u8]) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let guarded = inner
            .blobs
            .get(key)
            .is_some_and(|existing| contains(existing, marker));
        if guarded {
            return Ok(false);
        }
        inner.blobs.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner.blobs.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .blobs
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.blobs.remove(key).is_some())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn get_key(&self, address: &Address) -> Result<Option<StoredKey>> {
        let inner = self.inner.read().await;
        Ok(inner.keys.get(address).cloned())
    }

    async fn put_key(&self, address: &Address, key: &StoredKey) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.keys.insert(*address, key.clone());
        Ok(())
    }
}
