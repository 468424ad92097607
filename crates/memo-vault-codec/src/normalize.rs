//! Version-independent view of a memo.

use chrono::{DateTime, Utc};
use memo_vault_core::{Address, MemoId, TokenInfo, ValidationError, MIN_KEY_WRAPS};
use memo_vault_crypto::{algorithms, EncryptedEnvelope, KeyWrap, P256PublicKey};
use std::fmt;

use crate::additional::AdditionalInfo;
use crate::error::{CodecError, Result};
use crate::memo::{AddressedWrap, OnchainMemo, OnchainMemoV1, OnchainMemoV2};

/// Most wraps a memo may carry: sender, recipient, regulator.
const MAX_KEY_WRAPS: usize = 3;

/// Wire schema version of a decoded memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoVersion {
    /// Verbose schema.
    V1,
    /// Compact schema.
    V2,
}

impl MemoVersion {
    /// The integer `v` discriminant.
    pub const fn as_u8(self) -> u8 {
        match self {
            MemoVersion::V1 => 1,
            MemoVersion::V2 => 2,
        }
    }
}

/// Which party a key wrap belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapRole {
    Sender,
    Recipient,
    Regulator,
}

impl fmt::Display for WrapRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WrapRole::Sender => "sender",
            WrapRole::Recipient => "recipient",
            WrapRole::Regulator => "regulator",
        })
    }
}

/// A key wrap with the party it was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyWrap {
    pub role: WrapRole,
    /// Known for v1 wraps; v2 wraps are identified by position only.
    pub party: Option<Address>,
    pub wrap: KeyWrap,
}

/// A decoded memo in a single shape regardless of wire version.
///
/// `wraps` is always ordered `[sender, recipient, regulator?]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMemo {
    pub version: MemoVersion,
    /// Carried inline by v1; v2 memos are keyed by the contract instead.
    pub memo_id: Option<MemoId>,
    pub sender: Address,
    pub recipient: Address,
    pub created_at: DateTime<Utc>,
    pub token_address: Address,
    /// Full token metadata, v1 only.
    pub token: Option<TokenInfo>,
    pub amount_display: String,
    pub additional_info: Option<AdditionalInfo>,
    /// Inline in v1; v2 readers resolve it from the key registry.
    pub sender_public_key: Option<P256PublicKey>,
    pub regulator_public_key: Option<P256PublicKey>,
    pub envelope: EncryptedEnvelope,
    pub wraps: Vec<PartyWrap>,
}

impl NormalizedMemo {
    /// The wrap produced for `role`, if present.
    pub fn wrap_for(&self, role: WrapRole) -> Option<&PartyWrap> {
        self.wraps.iter().find(|w| w.role == role)
    }

    /// Token metadata, falling back to a placeholder for compact memos.
    pub fn token_info(&self) -> TokenInfo {
        self.token
            .clone()
            .unwrap_or_else(|| TokenInfo::unknown(self.token_address))
    }

    /// Whether `address` is the sender or the recipient.
    pub fn is_party(&self, address: &Address) -> bool {
        self.sender == *address || self.recipient == *address
    }
}

fn check_wrap_count(count: usize) -> Result<()> {
    if count < MIN_KEY_WRAPS {
        return Err(ValidationError::TooFewKeyWraps(count).into());
    }
    if count > MAX_KEY_WRAPS {
        return Err(CodecError::malformed(format!(
            "memo has {} key wraps, at most {} are allowed",
            count, MAX_KEY_WRAPS
        )));
    }
    Ok(())
}

fn expect_identifier(field: &str, actual: &str, expected: &str) -> Result<()> {
    if actual != expected {
        return Err(CodecError::malformed(format!(
            "unsupported {}: {}",
            field, actual
        )));
    }
    Ok(())
}

/// Take the first wrap addressed to `addr` out of `keys`.
fn take_wrap(keys: &mut Vec<AddressedWrap>, addr: &Address) -> Option<AddressedWrap> {
    let index = keys.iter().position(|k| k.addr == *addr)?;
    Some(keys.remove(index))
}

fn normalize_v1(memo: OnchainMemoV1) -> Result<NormalizedMemo> {
    check_wrap_count(memo.keys.len())?;
    expect_identifier("key algorithm", &memo.key_alg, algorithms::KEY_ALG)?;
    expect_identifier("kdf", &memo.kdf, algorithms::KDF)?;
    expect_identifier("cipher", &memo.enc.alg, algorithms::ENC_ALG)?;

    // Wraps may appear in any order; match them to parties by address.
    let mut keys = memo.keys;
    let sender = take_wrap(&mut keys, &memo.sender)
        .ok_or(CodecError::MissingWrap(WrapRole::Sender))?;
    let recipient = take_wrap(&mut keys, &memo.recipient)
        .ok_or(CodecError::MissingWrap(WrapRole::Recipient))?;

    let mut wraps = vec![
        PartyWrap {
            role: WrapRole::Sender,
            party: Some(sender.addr),
            wrap: sender.wrap,
        },
        PartyWrap {
            role: WrapRole::Recipient,
            party: Some(recipient.addr),
            wrap: recipient.wrap,
        },
    ];
    if let Some(regulator) = keys.into_iter().next() {
        wraps.push(PartyWrap {
            role: WrapRole::Regulator,
            party: Some(regulator.addr),
            wrap: regulator.wrap,
        });
    }

    Ok(NormalizedMemo {
        version: MemoVersion::V1,
        memo_id: Some(memo.memo_hash),
        sender: memo.sender,
        recipient: memo.recipient,
        created_at: memo.created_at,
        token_address: memo.token.address,
        token: Some(memo.token),
        amount_display: memo.amount_display,
        additional_info: None,
        sender_public_key: Some(memo.sender_pub_key),
        regulator_public_key: memo.regulator_pub_key,
        envelope: memo.enc.envelope,
        wraps,
    })
}

fn normalize_v2(memo: OnchainMemoV2) -> Result<NormalizedMemo> {
    check_wrap_count(memo.k.len())?;

    let created_at = DateTime::<Utc>::from_timestamp(memo.t, 0)
        .ok_or_else(|| CodecError::malformed(format!("timestamp out of range: {}", memo.t)))?;

    let roles = [WrapRole::Sender, WrapRole::Recipient, WrapRole::Regulator];
    let parties = [Some(memo.s), Some(memo.r), None];
    let wraps = memo
        .k
        .into_iter()
        .enumerate()
        .map(|(i, wrap)| PartyWrap {
            role: roles[i],
            party: parties[i],
            wrap: wrap.into(),
        })
        .collect();

    Ok(NormalizedMemo {
        version: MemoVersion::V2,
        memo_id: None,
        sender: memo.s,
        recipient: memo.r,
        created_at,
        token_address: memo.tk,
        token: None,
        amount_display: memo.amt,
        additional_info: memo.add,
        sender_public_key: None,
        regulator_public_key: None,
        envelope: EncryptedEnvelope {
            iv: memo.iv,
            ciphertext: memo.ct,
        },
        wraps,
    })
}

impl TryFrom<OnchainMemo> for NormalizedMemo {
    type Error = CodecError;

    fn try_from(memo: OnchainMemo) -> Result<Self> {
        match memo {
            OnchainMemo::V1(memo) => normalize_v1(memo),
            OnchainMemo::V2(memo) => normalize_v2(memo),
        }
    }
}
