//! Store traits: the abstract interfaces for persistence.
//!
//! These traits keep the indexer and the vault storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use memo_vault_core::Address;
use memo_vault_crypto::StoredKey;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Async keyed blob storage.
///
/// # Design Notes
///
/// - **Overwrite**: `put` replaces any previous value under the key.
/// - **Guarded overwrite**: `put_unless_contains` checks and writes as one
///   step, so a concurrent writer cannot slip in between.
/// - **Listing**: `list` returns every key starting with the prefix, in
///   ascending byte order.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Store `value` under `key` unless the current value contains
    /// `marker`. Returns whether the value was written.
    async fn put_unless_contains(&self, key: &str, value: &[u8], marker: &[u8]) -> Result<bool>;

    /// Fetch the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// List keys that start with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn put_unless_contains(&self, key: &str, value: &[u8], marker: &[u8]) -> Result<bool> {
        (**self).put_unless_contains(key, value, marker).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }
}

/// JSON helpers over any blob store.
pub trait BlobStoreExt: BlobStore {
    /// Fetch and deserialize a JSON document.
    fn get_json<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Serialize and store a JSON document.
    fn put_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<S: BlobStore + ?Sized> BlobStoreExt for S {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, &bytes).await
    }
}

/// Local private key storage, one key per address.
///
/// Addresses are always stored in their lowercase form.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Load the key stored for `address`.
    async fn get_key(&self, address: &Address) -> Result<Option<StoredKey>>;

    /// Store the key for `address`, replacing any previous key.
    async fn put_key(&self, address: &Address, key: &StoredKey) -> Result<()>;
}

#[async_trait]
impl<T: KeyStore + ?Sized> KeyStore for Arc<T> {
    async fn get_key(&self, address: &Address) -> Result<Option<StoredKey>> {
        (**self).get_key(address).await
    }

    async fn put_key(&self, address: &Address, key: &StoredKey) -> Result<()> {
        (**self).put_key(address, key).await
    }
}
