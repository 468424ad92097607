//! The two on-chain memo shapes.

use chrono::{DateTime, Utc};
use memo_vault_core::{Address, MemoId, TokenInfo};
use memo_vault_crypto::{EncryptedEnvelope, EncryptionNonce, KeyWrap, P256PublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::additional::AdditionalInfo;

/// Content type of every memo payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The integer `v` discriminant, fixed per struct.
///
/// Deserializing a different value fails, which is what lets a raw JSON
/// object be matched to exactly one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionTag<const N: u8>;

impl<const N: u8> VersionTag<N> {
    /// The tag value.
    pub const VALUE: u8 = N;
}

impl<const N: u8> Serialize for VersionTag<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(N)
    }
}

impl<'de, const N: u8> Deserialize<'de> for VersionTag<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u8::deserialize(deserializer)?;
        if v != N {
            return Err(serde::de::Error::custom(format!(
                "expected memo version {}, got {}",
                N, v
            )));
        }
        Ok(VersionTag)
    }
}

/// Verbose, self-describing memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainMemoV1 {
    pub v: VersionTag<1>,
    pub memo_hash: MemoId,
    pub sender: Address,
    pub recipient: Address,
    pub sender_pub_key: P256PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulator_pub_key: Option<P256PublicKey>,
    pub created_at: DateTime<Utc>,
    pub content_type: String,
    pub ivms_hash: MemoId,
    pub token: TokenInfo,
    pub amount_display: String,
    pub key_alg: String,
    pub kdf: String,
    pub enc: V1Encryption,
    pub keys: Vec<AddressedWrap>,
}

/// The `enc` object of a v1 memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V1Encryption {
    pub alg: String,
    #[serde(flatten)]
    pub envelope: EncryptedEnvelope,
}

/// A v1 key wrap, labelled with the party's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedWrap {
    pub addr: Address,
    #[serde(flatten)]
    pub wrap: KeyWrap,
}

/// Compact memo. Algorithms, content type and public keys are implied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnchainMemoV2 {
    pub v: VersionTag<2>,
    /// Sender.
    pub s: Address,
    /// Recipient.
    pub r: Address,
    /// Creation time, unix seconds.
    pub t: i64,
    /// Token address.
    pub tk: Address,
    /// Amount display string.
    pub amt: String,
    /// Optional free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<AdditionalInfo>,
    /// Payload IV.
    pub iv: EncryptionNonce,
    /// Payload ciphertext with tag.
    #[serde(with = "memo_vault_crypto::encoding::base64_bytes")]
    pub ct: Vec<u8>,
    /// Positional wraps: sender, recipient, regulator.
    pub k: Vec<CompactWrap>,
}

/// A v2 key wrap encoded as a two-element array `[iv, encKey]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactWrap(
    pub EncryptionNonce,
    #[serde(with = "memo_vault_crypto::encoding::base64_bytes")] pub Vec<u8>,
);

impl From<KeyWrap> for CompactWrap {
    fn from(wrap: KeyWrap) -> Self {
        CompactWrap(wrap.iv, wrap.wrapped_key)
    }
}

impl From<CompactWrap> for KeyWrap {
    fn from(wrap: CompactWrap) -> Self {
        KeyWrap {
            iv: wrap.0,
            wrapped_key: wrap.1,
        }
    }
}

/// Either memo shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OnchainMemo {
    V1(OnchainMemoV1),
    V2(OnchainMemoV2),
}

impl OnchainMemo {
    /// The wire discriminant.
    pub fn version(&self) -> u8 {
        match self {
            OnchainMemo::V1(_) => 1,
            OnchainMemo::V2(_) => 2,
        }
    }

    /// Number of key wraps carried.
    pub fn wrap_count(&self) -> usize {
        match self {
            OnchainMemo::V1(memo) => memo.keys.len(),
            OnchainMemo::V2(memo) => memo.k.len(),
        }
    }

    pub fn sender(&self) -> Address {
        match self {
            OnchainMemo::V1(memo) => memo.sender,
            OnchainMemo::V2(memo) => memo.s,
        }
    }

    pub fn recipient(&self) -> Address {
        match self {
            OnchainMemo::V1(memo) => memo.recipient,
            OnchainMemo::V2(memo) => memo.r,
        }
    }
}

impl From<OnchainMemoV1> for OnchainMemo {
    fn from(memo: OnchainMemoV1) -> Self {
        OnchainMemo::V1(memo)
    }
}

impl From<OnchainMemoV2> for OnchainMemo {
    fn from(memo: OnchainMemoV2) -> Self {
        OnchainMemo::V2(memo)
    }
}
