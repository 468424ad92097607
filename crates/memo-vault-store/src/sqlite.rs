//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use memo_vault_core::Address;
use memo_vault_crypto::StoredKey;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{BlobStore, KeyStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("connection lock poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn put_unless_contains(&self, key: &str, value: &[u8], marker: &[u8]) -> Result<bool> {
        let key = key.to_string();
        let value = value.to_vec();
        let marker = marker.to_vec();

        self.with_conn(move |conn| {
            // instr on two blobs is a byte search; an empty marker matches anything
            let written = conn.execute(
                "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                 WHERE instr(blobs.value, ?4) = 0",
                params![key, value, now_millis(), marker],
            )?;
            Ok(written > 0)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let value = conn
                .query_row("SELECT value FROM blobs WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();

        self.with_conn(move |conn| {
            // substr avoids LIKE wildcard escaping in keys
            let mut stmt = conn.prepare(
                "SELECT key FROM blobs WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )?;
            let keys = stmt
                .query_map(params![prefix], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(keys)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM blobs WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl KeyStore for SqliteStore {
    async fn get_key(&self, address: &Address) -> Result<Option<StoredKey>> {
        let address = address.to_hex();

        self.with_conn(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT stored_key FROM local_keys WHERE address = ?1",
                    params![address],
                    |row| row.get(0),
                )
                .optional()?;

            raw.map(|json| serde_json::from_str(&json).map_err(StoreError::from))
                .transpose()
        })
        .await
    }

    async fn put_key(&self, address: &Address, key: &StoredKey) -> Result<()> {
        let address = address.to_hex();
        let json = serde_json::to_string(key)?;
        let version = key.version;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO local_keys (address, stored_key, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(address) DO UPDATE SET
                    stored_key = excluded.stored_key,
                    version = excluded.version,
                    updated_at = excluded.updated_at",
                params![address, json, version, now_millis()],
            )?;
            Ok(())
        })
        .await
    }
}
