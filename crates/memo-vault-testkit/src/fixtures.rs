//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use chrono::{DateTime, Utc};
use memo_vault_codec::{AdditionalInfo, MemoDraft, SealingParties};
use memo_vault_core::{Address, IvmsPayload, TokenInfo};
use memo_vault_crypto::{CryptoError, P256PublicKey, P256SecretKey, StoredKey};
use memo_vault_store::{KeyStore, MemoryStore, StoreError};
use serde_json::json;

/// Block timestamp used as "genesis" by fixture chains.
pub const GENESIS_TIMESTAMP: i64 = 1_700_000_000;

/// A participant: an address and the P-256 key pair it encrypts with.
pub struct Party {
    pub address: Address,
    pub secret: P256SecretKey,
}

impl Party {
    /// A party with a random key.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            secret: P256SecretKey::generate(),
        }
    }

    /// A deterministic party: address `[tag; 20]`, private scalar `[tag; 32]`.
    ///
    /// `tag` must be non-zero.
    pub fn with_tag(tag: u8) -> Result<Self, CryptoError> {
        Ok(Self {
            address: Address::from_bytes([tag; 20]),
            secret: P256SecretKey::from_bytes(&[tag; 32])?,
        })
    }

    pub fn public_key(&self) -> P256PublicKey {
        self.secret.public_key()
    }

    /// The key in its persisted form.
    pub fn stored_key(&self, version: u32) -> Result<StoredKey, CryptoError> {
        StoredKey::from_secret(&self.secret, version)
    }
}

/// Sender, recipient and regulator with deterministic keys, plus a token.
pub struct TestFixture {
    pub sender: Party,
    pub recipient: Party,
    pub regulator: Party,
    pub token: TokenInfo,
}

impl TestFixture {
    pub fn new() -> Self {
        let party = |tag| Party::with_tag(tag).expect("non-zero tag is a valid scalar");
        Self {
            sender: party(0xaa),
            recipient: party(0xbb),
            regulator: party(0xcc),
            token: TokenInfo {
                address: Address::from_bytes([0x20; 20]),
                symbol: "AlphaUSD".to_string(),
                decimals: 6,
            },
        }
    }

    /// Public keys of recipient and (optionally) regulator.
    pub fn sealing_parties(&self, with_regulator: bool) -> SealingParties {
        SealingParties {
            recipient: self.recipient.public_key(),
            regulator: with_regulator
                .then(|| (self.regulator.address, self.regulator.public_key())),
        }
    }

    /// A transfer memo from sender to recipient carrying `payload`.
    pub fn draft(&self, payload: IvmsPayload) -> MemoDraft {
        MemoDraft {
            sender: self.sender.address,
            recipient: self.recipient.address,
            token: self.token.clone(),
            amount_display: "250.00".to_string(),
            created_at: fixed_time(GENESIS_TIMESTAMP),
            additional_info: Some(AdditionalInfo::truncated("invoice 2024-117")),
            payload,
            memo_id: None,
        }
    }

    /// Store every party's key in `keys`.
    pub async fn store_keys<K: KeyStore>(&self, keys: &K) -> Result<(), StoreError> {
        for party in [&self.sender, &self.recipient, &self.regulator] {
            let stored = party
                .stored_key(1)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            keys.put_key(&party.address, &stored).await?;
        }
        Ok(())
    }

    /// A key store already holding every party's key.
    pub async fn key_store(&self) -> Result<MemoryStore, StoreError> {
        let store = MemoryStore::new();
        self.store_keys(&store).await?;
        Ok(store)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A representative travel-rule payload; `reference` makes it unique.
pub fn sample_payload(reference: &str) -> IvmsPayload {
    IvmsPayload::json(json!({
        "originator": {
            "originatorPersons": [{
                "naturalPerson": {
                    "name": {"nameIdentifier": [{"primaryIdentifier": "Example", "secondaryIdentifier": "Alice"}]}
                }
            }],
            "accountNumber": ["0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"]
        },
        "beneficiary": {
            "beneficiaryPersons": [{
                "naturalPerson": {
                    "name": {"nameIdentifier": [{"primaryIdentifier": "Example", "secondaryIdentifier": "Bob"}]}
                }
            }],
            "accountNumber": ["0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"]
        },
        "transfer": {"amount": "250.00", "asset": "AlphaUSD", "reference": reference}
    }))
}

/// Create `count` parties with distinct deterministic keys.
pub fn multi_party_fixtures(count: u8) -> Vec<Party> {
    (1..=count)
        .map(|tag| Party::with_tag(tag).expect("non-zero tag is a valid scalar"))
        .collect()
}

/// A UTC timestamp from unix seconds; out-of-range input maps to the epoch.
pub fn fixed_time(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
