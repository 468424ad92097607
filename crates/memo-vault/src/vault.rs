//! The Vault: sealing, submitting, deleting and reading memos.
//!
//! The vault ties local key storage, the key registry and the memo store
//! contract together. All cryptography happens locally; the contracts only
//! ever see public keys and ciphertext.

use bytes::Bytes;
use memo_vault_codec::{
    decode, encode, open, seal, MemoDraft, MemoVersion, NormalizedMemo, SealingParties, WrapRole,
};
use memo_vault_core::{Address, IvmsPayload, MemoId};
use memo_vault_crypto::{CryptoError, P256PublicKey, P256SecretKey, StoredKey, KEY_TYPE_P256};
use memo_vault_store::KeyStore;

use crate::error::{MemoError, Result};
use crate::ledger::{KeyRegistry, MemoLedger};

/// Configuration for the Vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Regulator that receives a key wrap on every memo and may read it.
    pub regulator: Option<Address>,
    /// Version published with newly registered keys.
    pub key_version: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            regulator: None,
            key_version: 1,
        }
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMemo {
    pub memo_id: MemoId,
    pub tx_hash: String,
    /// Encoded size in bytes.
    pub size: usize,
}

/// A decrypted memo.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedMemo {
    pub memo_id: MemoId,
    pub memo: NormalizedMemo,
    pub payload: IvmsPayload,
    /// The capacity the reader opened it in.
    pub role: WrapRole,
}

/// Memo operations over a ledger, a key registry and local key storage.
pub struct MemoVault<L, R, K> {
    ledger: L,
    registry: R,
    keys: K,
    config: VaultConfig,
}

impl<L, R, K> MemoVault<L, R, K>
where
    L: MemoLedger,
    R: KeyRegistry,
    K: KeyStore,
{
    pub fn new(ledger: L, registry: R, keys: K, config: VaultConfig) -> Self {
        Self {
            ledger,
            registry,
            keys,
            config,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Generate a fresh key pair for `address`, store it locally and publish
    /// the public half.
    pub async fn register_key(&self, address: Address) -> Result<P256PublicKey> {
        let stored = StoredKey::generate(self.config.key_version)?;
        self.keys.put_key(&address, &stored).await?;
        self.registry
            .set_key(
                address,
                stored.public_key().to_sec1_bytes(),
                KEY_TYPE_P256,
                stored.version,
            )
            .await?;

        tracing::info!(%address, version = stored.version, "registered encryption key");
        Ok(stored.public_key().clone())
    }

    /// Reuse the local key if the registry already publishes it, otherwise
    /// register a new one.
    pub async fn ensure_key(&self, address: Address) -> Result<P256PublicKey> {
        if let Some(local) = self.keys.get_key(&address).await? {
            let published = self
                .registry
                .get_key(&address)
                .await?
                .map(|entry| entry.p256())
                .transpose()?;
            if published.as_ref() == Some(local.public_key()) {
                return Ok(local.public_key().clone());
            }
            tracing::debug!(%address, "local key not published, registering a new one");
        }
        self.register_key(address).await
    }

    /// Public key published for `address`.
    pub async fn lookup_key(&self, address: &Address) -> Result<P256PublicKey> {
        let entry = self
            .registry
            .get_key(address)
            .await?
            .ok_or(MemoError::KeyNotRegistered(*address))?;
        Ok(entry.p256()?)
    }

    async fn local_secret(&self, address: &Address) -> Result<P256SecretKey> {
        let stored = self
            .keys
            .get_key(address)
            .await?
            .ok_or_else(|| CryptoError::MissingKeyMaterial(address.to_hex()))?;
        Ok(stored.to_secret()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Memo Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Seal `draft` for its recipient (and the regulator, if configured) and
    /// store it on the ledger.
    ///
    /// The encoded memo is size-checked before the ledger is called.
    pub async fn send(&self, draft: &MemoDraft, version: MemoVersion) -> Result<SentMemo> {
        let sender_secret = self.local_secret(&draft.sender).await?;
        let recipient = self.lookup_key(&draft.recipient).await?;
        let regulator = match self.config.regulator {
            Some(address) => Some((address, self.lookup_key(&address).await?)),
            None => None,
        };

        let sealed = seal(
            draft,
            version,
            &sender_secret,
            &SealingParties {
                recipient,
                regulator,
            },
        )?;
        let bytes = encode(&sealed.memo)?;
        let size = bytes.len();

        let tx_hash = self
            .ledger
            .put_memo(
                sealed.memo_id,
                Bytes::from(bytes),
                draft.sender,
                draft.recipient,
            )
            .await?;

        tracing::info!(
            memo_id = %sealed.memo_id,
            version = version.as_u8(),
            size,
            "memo stored"
        );
        Ok(SentMemo {
            memo_id: sealed.memo_id,
            tx_hash,
            size,
        })
    }

    /// Delete a memo from the ledger. Only its recipient may do this.
    pub async fn delete(&self, memo_id: &MemoId, caller: Address) -> Result<String> {
        let memo = self
            .ledger
            .get_memo(memo_id)
            .await?
            .ok_or(MemoError::NotFound(*memo_id))?;
        if memo.recipient != caller {
            return Err(MemoError::NotAuthorized(format!(
                "only the recipient may delete memo {}",
                memo_id
            )));
        }

        let tx_hash = self.ledger.delete_memo(*memo_id, caller).await?;
        tracing::info!(%memo_id, %caller, "memo deleted");
        Ok(tx_hash)
    }

    /// Fetch and decrypt a memo as `reader`.
    ///
    /// The reader must be the sender, the recipient or the configured
    /// regulator, and must hold their private key locally.
    pub async fn read(&self, memo_id: &MemoId, reader: Address) -> Result<OpenedMemo> {
        let stored = self
            .ledger
            .get_memo(memo_id)
            .await?
            .ok_or(MemoError::NotFound(*memo_id))?;
        let memo = decode(&stored.data)?;

        let role = if reader == stored.sender {
            WrapRole::Sender
        } else if reader == stored.recipient {
            WrapRole::Recipient
        } else if self.config.regulator == Some(reader) {
            WrapRole::Regulator
        } else {
            return Err(MemoError::NotAuthorized(format!(
                "{} is not a party to memo {}",
                reader, memo_id
            )));
        };

        let reader_secret = self.local_secret(&reader).await?;
        let sender_public = match &memo.sender_public_key {
            Some(key) => key.clone(),
            None => self.lookup_key(&stored.sender).await?,
        };

        let payload = open(&memo, memo_id, &reader_secret, role, &sender_public)?;
        tracing::debug!(%memo_id, %reader, %role, "memo opened");

        Ok(OpenedMemo {
            memo_id: *memo_id,
            memo,
            payload,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MemoryKeyRegistry, MemoryLedger};
    use chrono::{DateTime, Utc};
    use memo_vault_codec::AdditionalInfo;
    use memo_vault_core::{TokenInfo, ValidationError, MAX_MEMO_BYTES};
    use memo_vault_indexer::MemoryChain;
    use memo_vault_store::MemoryStore;
    use memo_vault_testkit::generators::small_ivms_payload;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    const CONTRACT: Address = Address::from_bytes([0xc0; 20]);

    fn alice() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn bob() -> Address {
        Address::from_bytes([0xbb; 20])
    }

    fn regulator() -> Address {
        Address::from_bytes([0xcc; 20])
    }

    type TestVault = MemoVault<Arc<MemoryLedger>, Arc<MemoryKeyRegistry>, Arc<MemoryStore>>;

    fn vault(config: VaultConfig) -> TestVault {
        let chain = Arc::new(MemoryChain::new(1_700_000_000));
        MemoVault::new(
            Arc::new(MemoryLedger::new(chain, CONTRACT)),
            Arc::new(MemoryKeyRegistry::new()),
            Arc::new(MemoryStore::new()),
            config,
        )
    }

    fn draft(payload: serde_json::Value) -> MemoDraft {
        MemoDraft {
            sender: alice(),
            recipient: bob(),
            token: TokenInfo {
                address: Address::from_bytes([0x20; 20]),
                symbol: "AlphaUSD".to_string(),
                decimals: 6,
            },
            amount_display: "10.00".to_string(),
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            additional_info: Some(AdditionalInfo::truncated("March payroll")),
            payload: IvmsPayload::json(payload),
            memo_id: None,
        }
    }

    async fn registered(config: VaultConfig) -> TestVault {
        let vault = vault(config);
        vault.register_key(alice()).await.unwrap();
        vault.register_key(bob()).await.unwrap();
        vault.register_key(regulator()).await.unwrap();
        vault
    }

    #[tokio::test]
    async fn test_send_and_read_by_each_party() {
        let vault = registered(VaultConfig {
            regulator: Some(regulator()),
            ..VaultConfig::default()
        })
        .await;
        let payload = json!({"originator": {"name": "Alice"}, "beneficiary": {"name": "Bob"}});

        for version in [MemoVersion::V1, MemoVersion::V2] {
            let mut body = payload.clone();
            body["version"] = json!(version.as_u8());
            let draft = draft(body);
            let sent = vault.send(&draft, version).await.unwrap();
            assert!(sent.size <= MAX_MEMO_BYTES);

            for (reader, role) in [
                (alice(), WrapRole::Sender),
                (bob(), WrapRole::Recipient),
                (regulator(), WrapRole::Regulator),
            ] {
                let opened = vault.read(&sent.memo_id, reader).await.unwrap();
                assert_eq!(opened.role, role);
                assert_eq!(opened.payload, draft.payload);
                assert_eq!(opened.memo.version, version);
            }
        }
    }

    #[tokio::test]
    async fn test_outsider_cannot_read() {
        let vault = registered(VaultConfig::default()).await;
        let sent = vault.send(&draft(json!({"a": 1})), MemoVersion::V2).await.unwrap();

        // Without a configured regulator the regulator address is an outsider
        let err = vault.read(&sent.memo_id, regulator()).await.unwrap_err();
        assert!(matches!(err, MemoError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_read_without_local_key() {
        let vault = vault(VaultConfig::default());
        vault.register_key(alice()).await.unwrap();

        // Bob's key is published but lives on another device
        let bob_secret = P256SecretKey::generate();
        vault
            .registry
            .set_key(bob(), bob_secret.public_key().to_sec1_bytes(), KEY_TYPE_P256, 1)
            .await
            .unwrap();

        let sent = vault.send(&draft(json!({"a": 1})), MemoVersion::V2).await.unwrap();
        let err = vault.read(&sent.memo_id, bob()).await.unwrap_err();
        assert!(matches!(
            err,
            MemoError::Crypto(CryptoError::MissingKeyMaterial(_))
        ));
    }

    #[tokio::test]
    async fn test_send_requires_registered_recipient() {
        let vault = vault(VaultConfig::default());
        vault.register_key(alice()).await.unwrap();

        let err = vault
            .send(&draft(json!({"a": 1})), MemoVersion::V2)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoError::KeyNotRegistered(addr) if addr == bob()));
        assert!(vault.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn test_oversized_memo_never_reaches_ledger() {
        let vault = registered(VaultConfig::default()).await;
        let filler = "x".repeat(MAX_MEMO_BYTES);

        let err = vault
            .send(&draft(json!({ "notes": filler })), MemoVersion::V2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MemoError::Validation(ValidationError::SizeBudgetExceeded { .. })
        ));
        assert!(vault.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn test_only_recipient_deletes() {
        let vault = registered(VaultConfig::default()).await;
        let sent = vault.send(&draft(json!({"a": 1})), MemoVersion::V2).await.unwrap();

        let err = vault.delete(&sent.memo_id, alice()).await.unwrap_err();
        assert!(matches!(err, MemoError::NotAuthorized(_)));

        vault.delete(&sent.memo_id, bob()).await.unwrap();
        assert!(matches!(
            vault.read(&sent.memo_id, bob()).await,
            Err(MemoError::NotFound(_))
        ));
        assert!(matches!(
            vault.delete(&sent.memo_id, bob()).await,
            Err(MemoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_key_reuses_published_key() {
        let vault = vault(VaultConfig::default());
        let first = vault.ensure_key(alice()).await.unwrap();
        let second = vault.ensure_key(alice()).await.unwrap();
        assert_eq!(first, second);

        // A different published key forces re-registration
        vault
            .registry
            .set_key(
                alice(),
                P256SecretKey::generate().public_key().to_sec1_bytes(),
                KEY_TYPE_P256,
                1,
            )
            .await
            .unwrap();
        let third = vault.ensure_key(alice()).await.unwrap();
        assert_ne!(third, first);
        assert_eq!(vault.lookup_key(&alice()).await.unwrap(), third);
    }

    #[tokio::test]
    async fn test_rotated_recipient_key_cannot_open_old_memo() {
        let vault = registered(VaultConfig::default()).await;
        let sent = vault.send(&draft(json!({"a": 1})), MemoVersion::V2).await.unwrap();

        vault.register_key(bob()).await.unwrap();
        let err = vault.read(&sent.memo_id, bob()).await.unwrap_err();
        assert!(matches!(
            err,
            MemoError::Crypto(CryptoError::AuthenticationFailed)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn any_small_payload_reaches_recipient(
            payload in small_ivms_payload(),
            compact in any::<bool>(),
        ) {
            let version = if compact { MemoVersion::V2 } else { MemoVersion::V1 };
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let opened = runtime.block_on(async {
                let vault = registered(VaultConfig::default()).await;
                let mut draft = draft(json!({}));
                draft.payload = payload.clone();
                let sent = vault.send(&draft, version).await.unwrap();
                vault.read(&sent.memo_id, bob()).await.unwrap()
            });
            prop_assert_eq!(opened.payload, payload);
            prop_assert_eq!(opened.role, WrapRole::Recipient);
        }
    }
}
