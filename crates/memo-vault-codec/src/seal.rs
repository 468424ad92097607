//! Building encrypted memos from plaintext drafts, and opening them again.
//!
//! Sealing:
//! 1. Canonicalize the IVMS payload; its hash is the memo id unless the
//!    sender supplied one.
//! 2. Encrypt the canonical payload under a fresh data key.
//! 3. Wrap the data key for sender, recipient and optional regulator, always
//!    with the sender's private key as the ECDH owner.
//! 4. Lay the result out as a v1 or v2 memo.

use chrono::{DateTime, Utc};
use memo_vault_core::{
    canonicalize_serializable, hash, Address, IvmsPayload, MemoId, TokenInfo, ValidationError,
};
use memo_vault_crypto::{
    algorithms, decrypt_data_key, decrypt_payload, encrypt_data_key_for, encrypt_payload,
    P256PublicKey, P256SecretKey,
};

use crate::additional::AdditionalInfo;
use crate::error::{CodecError, Result};
use crate::memo::{
    AddressedWrap, OnchainMemo, OnchainMemoV1, OnchainMemoV2, V1Encryption, VersionTag,
    CONTENT_TYPE_JSON,
};
use crate::normalize::{MemoVersion, NormalizedMemo, WrapRole};

/// Plaintext memo content prior to sealing.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoDraft {
    pub sender: Address,
    pub recipient: Address,
    pub token: TokenInfo,
    pub amount_display: String,
    pub created_at: DateTime<Utc>,
    /// Compact memos only; dropped when sealing a v1 memo.
    pub additional_info: Option<AdditionalInfo>,
    pub payload: IvmsPayload,
    /// Sender-chosen id; defaults to the canonical payload hash.
    pub memo_id: Option<MemoId>,
}

/// Public keys of the parties other than the sender.
#[derive(Debug, Clone)]
pub struct SealingParties {
    pub recipient: P256PublicKey,
    pub regulator: Option<(Address, P256PublicKey)>,
}

/// A sealed memo and the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedMemo {
    pub memo_id: MemoId,
    pub memo: OnchainMemo,
}

/// Encrypt a draft into an on-chain memo of the requested version.
///
/// The returned memo has not been size-checked; pass it through
/// [`crate::encode`] before submitting.
pub fn seal(
    draft: &MemoDraft,
    version: MemoVersion,
    sender_secret: &P256SecretKey,
    parties: &SealingParties,
) -> Result<SealedMemo> {
    let canonical = canonicalize_serializable(&draft.payload)?;
    let content_hash = hash(&canonical);
    let memo_id = draft.memo_id.unwrap_or(content_hash);

    let sealed = encrypt_payload(canonical.as_bytes())?;
    let sender_public = sender_secret.public_key();

    let sender_wrap = encrypt_data_key_for(&memo_id, sender_secret, &sender_public, &sealed.data_key)?;
    let recipient_wrap =
        encrypt_data_key_for(&memo_id, sender_secret, &parties.recipient, &sealed.data_key)?;
    let regulator_wrap = match &parties.regulator {
        Some((address, public)) => Some((
            *address,
            public.clone(),
            encrypt_data_key_for(&memo_id, sender_secret, public, &sealed.data_key)?,
        )),
        None => None,
    };

    // Millisecond precision, as produced by `Date.prototype.toISOString`.
    let created_at = DateTime::<Utc>::from_timestamp_millis(draft.created_at.timestamp_millis())
        .unwrap_or(draft.created_at);

    let memo = match version {
        MemoVersion::V1 => {
            if draft.additional_info.is_some() {
                tracing::debug!(%memo_id, "dropping additional info from v1 memo");
            }

            let mut keys = vec![
                AddressedWrap {
                    addr: draft.sender,
                    wrap: sender_wrap,
                },
                AddressedWrap {
                    addr: draft.recipient,
                    wrap: recipient_wrap,
                },
            ];
            let mut regulator_pub_key = None;
            if let Some((address, public, wrap)) = regulator_wrap {
                keys.push(AddressedWrap { addr: address, wrap });
                regulator_pub_key = Some(public);
            }

            OnchainMemo::V1(OnchainMemoV1 {
                v: VersionTag,
                memo_hash: memo_id,
                sender: draft.sender,
                recipient: draft.recipient,
                sender_pub_key: sender_public,
                regulator_pub_key,
                created_at,
                content_type: CONTENT_TYPE_JSON.to_string(),
                ivms_hash: content_hash,
                token: draft.token.clone(),
                amount_display: draft.amount_display.clone(),
                key_alg: algorithms::KEY_ALG.to_string(),
                kdf: algorithms::KDF.to_string(),
                enc: V1Encryption {
                    alg: algorithms::ENC_ALG.to_string(),
                    envelope: sealed.envelope.clone(),
                },
                keys,
            })
        }
        MemoVersion::V2 => {
            let mut k = vec![sender_wrap.into(), recipient_wrap.into()];
            if let Some((_, _, wrap)) = regulator_wrap {
                k.push(wrap.into());
            }

            OnchainMemo::V2(OnchainMemoV2 {
                v: VersionTag,
                s: draft.sender,
                r: draft.recipient,
                t: created_at.timestamp(),
                tk: draft.token.address,
                amt: draft.amount_display.clone(),
                add: draft.additional_info.clone(),
                iv: sealed.envelope.iv,
                ct: sealed.envelope.ciphertext.clone(),
                k,
            })
        }
    };

    Ok(SealedMemo { memo_id, memo })
}

/// Decrypt a memo's payload as one of its parties.
///
/// `reader_secret` is the reader's private key and `sender_public` the
/// sealing party's public key (for the sender's own wrap, the reader is the
/// sender and both halves belong to them).
pub fn open(
    memo: &NormalizedMemo,
    memo_id: &MemoId,
    reader_secret: &P256SecretKey,
    reader_role: WrapRole,
    sender_public: &P256PublicKey,
) -> Result<IvmsPayload> {
    let party_wrap = memo
        .wrap_for(reader_role)
        .ok_or(CodecError::MissingWrap(reader_role))?;

    let data_key = decrypt_data_key(memo_id, reader_secret, sender_public, &party_wrap.wrap)?;
    let plaintext = decrypt_payload(&data_key, &memo.envelope)?;

    serde_json::from_slice(&plaintext).map_err(|e| {
        CodecError::Validation(ValidationError::Malformed(format!(
            "decrypted payload is not an IVMS document: {}",
            e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{decode, encode, size};
    use memo_vault_core::{memo_id_for, MAX_MEMO_BYTES};
    use memo_vault_crypto::{generate_key_pair, CryptoError};
    use proptest::prelude::*;
    use serde_json::json;

    struct Parties {
        sender: P256SecretKey,
        recipient: P256SecretKey,
        regulator: P256SecretKey,
        regulator_address: Address,
    }

    fn parties() -> Parties {
        Parties {
            sender: P256SecretKey::generate(),
            recipient: P256SecretKey::generate(),
            regulator: P256SecretKey::generate(),
            regulator_address: Address::from_bytes([0xcc; 20]),
        }
    }

    fn draft(payload: IvmsPayload) -> MemoDraft {
        MemoDraft {
            sender: Address::from_bytes([0xaa; 20]),
            recipient: Address::from_bytes([0xbb; 20]),
            token: TokenInfo {
                address: Address::from_bytes([0x20; 20]),
                symbol: "AlphaUSD".to_string(),
                decimals: 6,
            },
            amount_display: "100.00".to_string(),
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 123_456_789).unwrap(),
            additional_info: Some(AdditionalInfo::truncated("Invoice 42")),
            payload,
            memo_id: None,
        }
    }

    fn sample_payload() -> IvmsPayload {
        IvmsPayload::json(json!({
            "originator": {"name": "Alice Example", "institution": "Test Bank A", "country": "US"},
            "beneficiary": {"name": "Bob Example", "institution": "Test Bank B", "country": "GB"},
            "transaction": {"purpose": "Payroll", "reference": "REF-1"}
        }))
    }

    fn sealing(p: &Parties) -> SealingParties {
        SealingParties {
            recipient: p.recipient.public_key(),
            regulator: Some((p.regulator_address, p.regulator.public_key())),
        }
    }

    #[test]
    fn test_seal_open_every_party_both_versions() {
        let p = parties();
        let payload = sample_payload();

        for version in [MemoVersion::V1, MemoVersion::V2] {
            let sealed = seal(&draft(payload.clone()), version, &p.sender, &sealing(&p)).unwrap();
            assert_eq!(sealed.memo_id, memo_id_for(&payload).unwrap());

            let normalized = decode(&encode(&sealed.memo).unwrap()).unwrap();
            assert_eq!(normalized.version, version);

            let sender_pub = p.sender.public_key();
            for (reader, role) in [
                (&p.sender, WrapRole::Sender),
                (&p.recipient, WrapRole::Recipient),
                (&p.regulator, WrapRole::Regulator),
            ] {
                let opened = open(&normalized, &sealed.memo_id, reader, role, &sender_pub).unwrap();
                assert_eq!(opened, payload);
            }
        }
    }

    #[test]
    fn test_v1_carries_inline_metadata() {
        let p = parties();
        let sealed = seal(&draft(sample_payload()), MemoVersion::V1, &p.sender, &sealing(&p)).unwrap();
        let normalized = decode(&encode(&sealed.memo).unwrap()).unwrap();

        assert_eq!(normalized.memo_id, Some(sealed.memo_id));
        assert_eq!(normalized.sender_public_key, Some(p.sender.public_key()));
        assert_eq!(normalized.regulator_public_key, Some(p.regulator.public_key()));
        assert_eq!(normalized.token.unwrap().symbol, "AlphaUSD");
        assert!(normalized.additional_info.is_none());
        // Sub-millisecond precision is dropped
        assert_eq!(normalized.created_at.timestamp_subsec_millis(), 123);
        assert_eq!(normalized.created_at.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_v2_smaller_than_v1() {
        let p = parties();
        let d = draft(sample_payload());
        let v1 = seal(&d, MemoVersion::V1, &p.sender, &sealing(&p)).unwrap();
        let v2 = seal(&d, MemoVersion::V2, &p.sender, &sealing(&p)).unwrap();

        let v1_size = size(&v1.memo).unwrap();
        let v2_size = size(&v2.memo).unwrap();
        assert!(v2_size < v1_size, "v2 {} >= v1 {}", v2_size, v1_size);
        assert!(v1_size <= MAX_MEMO_BYTES);
    }

    #[test]
    fn test_oversized_payload_rejected_by_encode() {
        let p = parties();
        let big = IvmsPayload::text("x".repeat(3000));
        let sealed = seal(&draft(big), MemoVersion::V2, &p.sender, &sealing(&p)).unwrap();

        match encode(&sealed.memo) {
            Err(CodecError::Validation(ValidationError::SizeBudgetExceeded { size, limit })) => {
                assert!(size > limit);
                assert_eq!(limit, MAX_MEMO_BYTES);
            }
            other => panic!("expected size budget error, got {:?}", other),
        }
    }

    #[test]
    fn test_sender_chosen_memo_id() {
        let p = parties();
        let mut d = draft(sample_payload());
        let chosen = MemoId::from_bytes([0x77; 32]);
        d.memo_id = Some(chosen);

        let sealed = seal(&d, MemoVersion::V1, &p.sender, &sealing(&p)).unwrap();
        assert_eq!(sealed.memo_id, chosen);

        let normalized = decode(&encode(&sealed.memo).unwrap()).unwrap();
        let opened = open(
            &normalized,
            &chosen,
            &p.recipient,
            WrapRole::Recipient,
            &p.sender.public_key(),
        )
        .unwrap();
        assert_eq!(opened, d.payload);
    }

    #[test]
    fn test_open_with_wrong_key_fails_closed() {
        let p = parties();
        let sealed = seal(&draft(sample_payload()), MemoVersion::V2, &p.sender, &sealing(&p)).unwrap();
        let normalized = decode(&encode(&sealed.memo).unwrap()).unwrap();
        let (stranger, _) = generate_key_pair();

        assert_eq!(
            open(&normalized, &sealed.memo_id, &stranger, WrapRole::Recipient, &p.sender.public_key())
                .unwrap_err(),
            CodecError::Crypto(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_open_missing_regulator_wrap() {
        let p = parties();
        let no_regulator = SealingParties {
            recipient: p.recipient.public_key(),
            regulator: None,
        };
        let sealed = seal(&draft(sample_payload()), MemoVersion::V2, &p.sender, &no_regulator).unwrap();
        let normalized = decode(&encode(&sealed.memo).unwrap()).unwrap();
        assert_eq!(normalized.wraps.len(), 2);

        assert_eq!(
            open(&normalized, &sealed.memo_id, &p.regulator, WrapRole::Regulator, &p.sender.public_key())
                .unwrap_err(),
            CodecError::MissingWrap(WrapRole::Regulator)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails_closed() {
        let p = parties();
        let sealed = seal(&draft(sample_payload()), MemoVersion::V2, &p.sender, &sealing(&p)).unwrap();
        let mut normalized = decode(&encode(&sealed.memo).unwrap()).unwrap();
        normalized.envelope.ciphertext[3] ^= 0x80;

        assert_eq!(
            open(&normalized, &sealed.memo_id, &p.recipient, WrapRole::Recipient, &p.sender.public_key())
                .unwrap_err(),
            CodecError::Crypto(CryptoError::AuthenticationFailed)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_compact_memo_survives_the_wire(
            text in "[ -~]{0,200}",
            note in "[a-zA-Z0-9 ]{1,40}",
            cents in 0u64..10_000_000_000,
            seconds in 1_600_000_000i64..2_000_000_000,
            with_regulator in any::<bool>(),
        ) {
            let p = parties();
            let payload = IvmsPayload::text(text);
            let mut memo = draft(payload.clone());
            memo.amount_display = format!("{}.{:02}", cents / 100, cents % 100);
            memo.created_at = DateTime::<Utc>::from_timestamp(seconds, 0).unwrap();
            memo.additional_info = Some(AdditionalInfo::truncated(&note));
            let mut parties = sealing(&p);
            if !with_regulator {
                parties.regulator = None;
            }

            let sealed = seal(&memo, MemoVersion::V2, &p.sender, &parties).unwrap();
            let bytes = encode(&sealed.memo).unwrap();
            prop_assert!(bytes.len() <= MAX_MEMO_BYTES);

            let normalized = decode(&bytes).unwrap();
            prop_assert_eq!(normalized.version, MemoVersion::V2);
            prop_assert_eq!(normalized.sender, memo.sender);
            prop_assert_eq!(normalized.recipient, memo.recipient);
            prop_assert_eq!(&normalized.amount_display, &memo.amount_display);
            prop_assert_eq!(normalized.created_at, memo.created_at);
            prop_assert_eq!(&normalized.additional_info, &memo.additional_info);
            prop_assert_eq!(normalized.wraps.len(), if with_regulator { 3 } else { 2 });

            let opened = open(
                &normalized,
                &sealed.memo_id,
                &p.recipient,
                WrapRole::Recipient,
                &p.sender.public_key(),
            )
            .unwrap();
            prop_assert_eq!(opened, payload);
        }
    }
}
