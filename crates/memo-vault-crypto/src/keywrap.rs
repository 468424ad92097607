//! Per-party wrapping of the one-time data key.
//!
//! The wrap key for a (memo, owner, peer) triple is
//! `HKDF-SHA256(ikm = ECDH(owner, peer), salt = memo_id, info = "tempo-memo-key")`.
//! Salting with the memo id means the same pair of keys never reuses a wrap
//! key across memos. Wrap keys are derived on every call and never cached.

use memo_vault_core::MemoId;
use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptionKey, EncryptionNonce, P256PublicKey, P256SecretKey};
use crate::error::Result;

/// HKDF info string binding wrap keys to this protocol.
pub const WRAP_KEY_INFO: &[u8] = b"tempo-memo-key";

/// The data key encrypted for one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWrap {
    /// IV used for this wrap.
    pub iv: EncryptionNonce,
    /// The encrypted data key (32 bytes + 16-byte tag).
    #[serde(rename = "encKey", with = "crate::encoding::base64_bytes")]
    pub wrapped_key: Vec<u8>,
}

/// Derive the wrap key shared by `owner` and `peer` for one memo.
pub fn derive_wrap_key(
    memo_id: &MemoId,
    owner: &P256SecretKey,
    peer: &P256PublicKey,
) -> Result<EncryptionKey> {
    owner
        .diffie_hellman(peer)
        .derive_key(memo_id.as_bytes(), WRAP_KEY_INFO)
}

/// Wrap `data_key` so that the holder of `peer`'s private key can recover it.
///
/// The sealing side passes its own private key as `owner`; its own wrap uses
/// its own public key as `peer`.
pub fn encrypt_data_key_for(
    memo_id: &MemoId,
    owner: &P256SecretKey,
    peer: &P256PublicKey,
    data_key: &EncryptionKey,
) -> Result<KeyWrap> {
    let wrap_key = derive_wrap_key(memo_id, owner, peer)?;
    let iv = EncryptionNonce::generate();
    let wrapped_key = wrap_key.encrypt(data_key.as_bytes(), &iv)?;
    Ok(KeyWrap { iv, wrapped_key })
}

/// Recover a data key from a wrap.
///
/// `owner` is the reader's private key and `peer` the sealer's public key.
pub fn decrypt_data_key(
    memo_id: &MemoId,
    owner: &P256SecretKey,
    peer: &P256PublicKey,
    wrap: &KeyWrap,
) -> Result<EncryptionKey> {
    let wrap_key = derive_wrap_key(memo_id, owner, peer)?;
    let raw = zeroize::Zeroizing::new(wrap_key.decrypt(&wrap.wrapped_key, &wrap.iv)?);
    EncryptionKey::from_slice(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key_pair;
    use crate::encoding;
    use crate::error::CryptoError;

    fn memo_id() -> MemoId {
        MemoId::from_bytes([0x01; 32])
    }

    #[test]
    fn test_wrap_roundtrip_both_directions() {
        let (sender, sender_pub) = generate_key_pair();
        let (recipient, recipient_pub) = generate_key_pair();
        let data_key = EncryptionKey::generate();

        // Sender wraps for recipient, recipient unwraps with sender's public key
        let wrap = encrypt_data_key_for(&memo_id(), &sender, &recipient_pub, &data_key).unwrap();
        let recovered = decrypt_data_key(&memo_id(), &recipient, &sender_pub, &wrap).unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());

        // And the reverse direction
        let wrap = encrypt_data_key_for(&memo_id(), &recipient, &sender_pub, &data_key).unwrap();
        let recovered = decrypt_data_key(&memo_id(), &sender, &recipient_pub, &wrap).unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());
    }

    #[test]
    fn test_independent_wraps_for_each_party() {
        let (sender, sender_pub) = generate_key_pair();
        let (recipient, recipient_pub) = generate_key_pair();
        let (regulator, regulator_pub) = generate_key_pair();
        let data_key = EncryptionKey::generate();
        let id = memo_id();

        let own = encrypt_data_key_for(&id, &sender, &sender_pub, &data_key).unwrap();
        let to_recipient = encrypt_data_key_for(&id, &sender, &recipient_pub, &data_key).unwrap();
        let to_regulator = encrypt_data_key_for(&id, &sender, &regulator_pub, &data_key).unwrap();

        for (reader, wrap) in [(&sender, &own), (&recipient, &to_recipient), (&regulator, &to_regulator)] {
            let recovered = decrypt_data_key(&id, reader, &sender_pub, wrap).unwrap();
            assert_eq!(recovered.as_bytes(), data_key.as_bytes());
        }

        // A party cannot open another party's wrap
        assert_eq!(
            decrypt_data_key(&id, &recipient, &sender_pub, &to_regulator).unwrap_err(),
            CryptoError::AuthenticationFailed
        );
    }

    #[test]
    fn test_memo_id_is_bound_into_wrap_key() {
        let (sender, sender_pub) = generate_key_pair();
        let (recipient, recipient_pub) = generate_key_pair();
        let data_key = EncryptionKey::generate();

        let wrap = encrypt_data_key_for(&memo_id(), &sender, &recipient_pub, &data_key).unwrap();
        let other_memo = MemoId::from_bytes([0x02; 32]);
        assert_eq!(
            decrypt_data_key(&other_memo, &recipient, &sender_pub, &wrap).unwrap_err(),
            CryptoError::AuthenticationFailed
        );
    }

    #[test]
    fn test_tampered_wrap_fails() {
        let (sender, sender_pub) = generate_key_pair();
        let (recipient, recipient_pub) = generate_key_pair();
        let data_key = EncryptionKey::generate();

        let mut wrap = encrypt_data_key_for(&memo_id(), &sender, &recipient_pub, &data_key).unwrap();
        wrap.wrapped_key[0] ^= 0x01;
        assert_eq!(
            decrypt_data_key(&memo_id(), &recipient, &sender_pub, &wrap).unwrap_err(),
            CryptoError::AuthenticationFailed
        );
    }

    #[test]
    fn test_known_wrap_vector() {
        // Produced by an independent P-256 / HKDF / AES-GCM implementation
        let alice = P256SecretKey::from_bytes(&[0x11; 32]).unwrap();
        let bob = P256SecretKey::from_bytes(&[0x22; 32]).unwrap();

        let wrap_key = derive_wrap_key(&memo_id(), &alice, &bob.public_key()).unwrap();
        assert_eq!(
            hex::encode(wrap_key.as_bytes()),
            "0c8e6dab332020dc7a38eace0181490faeb7d89cfc5e5425473549442e29ced4"
        );

        let wrap = KeyWrap {
            iv: EncryptionNonce::from_bytes([0x44; 12]),
            wrapped_key: encoding::decode(
                "dypx4Ad/30zHwKvPzhPN/PhhXNbrGlOW9OZOPzkDbfbTRoHmOt7LE0KwlHQAoola",
            )
            .unwrap(),
        };
        let recovered = decrypt_data_key(&memo_id(), &bob, &alice.public_key(), &wrap).unwrap();
        assert_eq!(recovered.as_bytes(), &[0x33; 32]);
    }

    #[test]
    fn test_short_data_key_rejected() {
        let (sender, sender_pub) = generate_key_pair();
        let (recipient, recipient_pub) = generate_key_pair();

        // Wrap 16 bytes instead of a 32-byte data key
        let wrap_key = derive_wrap_key(&memo_id(), &sender, &recipient_pub).unwrap();
        let iv = EncryptionNonce::generate();
        let wrap = KeyWrap {
            iv,
            wrapped_key: wrap_key.encrypt(&[0u8; 16], &iv).unwrap(),
        };
        assert_eq!(
            decrypt_data_key(&memo_id(), &recipient, &sender_pub, &wrap).unwrap_err(),
            CryptoError::InvalidKeyLength { expected: 32, actual: 16 }
        );
    }

    #[test]
    fn test_key_wrap_wire_shape() {
        let wrap = KeyWrap {
            iv: EncryptionNonce::from_bytes([0x44; 12]),
            wrapped_key: b"ab".to_vec(),
        };
        let json = serde_json::to_string(&wrap).unwrap();
        assert_eq!(json, r#"{"iv":"RERERERERERERERE","encKey":"YWI="}"#);
    }
}
