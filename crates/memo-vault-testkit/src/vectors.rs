//! Golden test vectors for deterministic verification.
//!
//! Canonicalization and the key-wrap scheme must match other clients byte
//! for byte, so these vectors pin both. The crypto vectors were produced
//! with an independent P-256 / HKDF-SHA256 / AES-256-GCM implementation.

use memo_vault_core::{canonicalize, hash, MemoId};
use memo_vault_crypto::{
    decrypt_data_key, decrypt_payload, derive_wrap_key, encoding, CryptoError, EncryptedEnvelope,
    EncryptionKey, EncryptionNonce, KeyWrap, P256SecretKey,
};
use serde_json::Value;

/// A canonical-JSON golden vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input JSON, keys in arbitrary order.
    pub input: &'static str,
    /// Expected canonical form.
    pub canonical: &'static str,
    /// Expected memo id (hex).
    pub expected_memo_id: &'static str,
}

/// Get all canonical-JSON golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "Empty canonical string",
            input: "",
            canonical: "",
            expected_memo_id: "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
        },
        GoldenVector {
            name: "Nested objects with array",
            input: r#"{"b": 1, "a": {"d": [3, {"z": true, "y": null}], "c": "x"}}"#,
            canonical: r#"{"a":{"c":"x","d":[3,{"y":null,"z":true}]},"b":1}"#,
            expected_memo_id: "0xaf8aa775cd3df4996b78994c5469c863982a5c89921e311360385ac0d4c1aed0",
        },
        GoldenVector {
            name: "Non-ASCII string value",
            input: r#"{"name": "Zoë", "amount": "1.50"}"#,
            canonical: r#"{"amount":"1.50","name":"Zoë"}"#,
            expected_memo_id: "0xde579536dd1a0052c3b97bd26b79867f8348fef27936caad84e61c180ba33dfa",
        },
    ]
}

/// Canonicalize a vector's input. The empty input stands for the empty string.
pub fn canonical_from_vector(vector: &GoldenVector) -> Result<String, serde_json::Error> {
    if vector.input.is_empty() {
        return Ok(String::new());
    }
    let value: Value = serde_json::from_str(vector.input)?;
    Ok(canonicalize(&value))
}

/// Verify all golden vectors.
///
/// Returns `(name, passed, computed memo id)` for each vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match canonical_from_vector(v) {
            Ok(canonical) => {
                let id = hash(&canonical).to_hex();
                let passed = canonical == v.canonical && id == v.expected_memo_id;
                (v.name.to_string(), passed, id)
            }
            Err(e) => (v.name.to_string(), false, e.to_string()),
        })
        .collect()
}

/// The fixed key-wrap scenario: Alice (`0x11..`) wraps data key `0x33..`
/// for Bob (`0x22..`) under memo id `0x01..`.
pub struct WrapVector {
    pub alice_secret: [u8; 32],
    pub bob_secret: [u8; 32],
    pub alice_public_hex: &'static str,
    pub bob_public_hex: &'static str,
    pub shared_secret_hex: &'static str,
    pub memo_id: MemoId,
    pub wrap_key_hex: &'static str,
    pub data_key: [u8; 32],
    /// IV of the wrap, base64.
    pub wrap_iv: &'static str,
    /// Wrapped data key with tag, base64.
    pub wrapped_key: &'static str,
    /// Payload IV, base64.
    pub payload_iv: &'static str,
    pub payload_plaintext: &'static str,
    /// Payload ciphertext with tag, base64.
    pub payload_ciphertext: &'static str,
}

pub fn wrap_vector() -> WrapVector {
    WrapVector {
        alice_secret: [0x11; 32],
        bob_secret: [0x22; 32],
        alice_public_hex: "0x040217e617f0b6443928278f96999e69a23a4f2c152bdf6d6cdf66e5b80282d4ed\
                           194a7debcb97712d2dda3ca85aa8765a56f45fc758599652f2897c65306e5794",
        bob_public_hex: "0x04d65a93977caa3d1b081852ff57a79e465f1660577304baead505dd3a48589cf3\
                         50185e895372df6221ea3a137557e473fddb6755f05bd507c3c533fce9c91285",
        shared_secret_hex: "ccfc261f58193c98ca4ad4a53bbac6f0ee29bc4d48438090446908622ca79af6",
        memo_id: MemoId::from_bytes([0x01; 32]),
        wrap_key_hex: "0c8e6dab332020dc7a38eace0181490faeb7d89cfc5e5425473549442e29ced4",
        data_key: [0x33; 32],
        wrap_iv: "RERERERERERERERE",
        wrapped_key: "dypx4Ad/30zHwKvPzhPN/PhhXNbrGlOW9OZOPzkDbfbTRoHmOt7LE0KwlHQAoola",
        payload_iv: "VVVVVVVVVVVVVVVV",
        payload_plaintext: r#"{"format":"text","payload":"hello","schema":"ivms-1"}"#,
        payload_ciphertext: "arzEb1Aa3VPHg31NFslEsailc6X3tyPDN7TNp/s1UezF2LVE6St7RQ1y0wTdG+RspLLyq3dde6LLK4xxohvbiUINYsNN",
    }
}

/// Check the wrap vector end to end: keys, ECDH, HKDF, unwrap and payload.
pub fn verify_wrap_vector(v: &WrapVector) -> Result<(), CryptoError> {
    let alice = P256SecretKey::from_bytes(&v.alice_secret)?;
    let bob = P256SecretKey::from_bytes(&v.bob_secret)?;
    let mismatch = |what: &str| CryptoError::Encoding(format!("{} does not match", what));

    if alice.public_key().to_hex() != v.alice_public_hex {
        return Err(mismatch("alice public key"));
    }
    if bob.public_key().to_hex() != v.bob_public_hex {
        return Err(mismatch("bob public key"));
    }
    if hex::encode(alice.diffie_hellman(&bob.public_key()).as_bytes()) != v.shared_secret_hex {
        return Err(mismatch("shared secret"));
    }
    let wrap_key = derive_wrap_key(&v.memo_id, &alice, &bob.public_key())?;
    if hex::encode(wrap_key.as_bytes()) != v.wrap_key_hex {
        return Err(mismatch("wrap key"));
    }

    let wrap = KeyWrap {
        iv: EncryptionNonce::from_base64(v.wrap_iv)?,
        wrapped_key: encoding::decode(v.wrapped_key)?,
    };
    let data_key = decrypt_data_key(&v.memo_id, &bob, &alice.public_key(), &wrap)?;
    if data_key.as_bytes() != &v.data_key {
        return Err(mismatch("data key"));
    }

    let envelope = EncryptedEnvelope {
        iv: EncryptionNonce::from_base64(v.payload_iv)?,
        ciphertext: encoding::decode(v.payload_ciphertext)?,
    };
    let plaintext = decrypt_payload(&EncryptionKey::from_bytes(v.data_key), &envelope)?;
    if plaintext != v.payload_plaintext.as_bytes() {
        return Err(mismatch("payload"));
    }
    Ok(())
}
