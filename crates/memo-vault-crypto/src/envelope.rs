//! Payload encryption under a one-time data key.
//!
//! ```text
//! plaintext --AES-256-GCM(data_key, iv)--> EncryptedEnvelope { iv, ciphertext || tag }
//! ```
//!
//! The data key never leaves the sealing side in the clear; it travels only
//! inside per-party key wraps (see [`crate::keywrap`]).

use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::Result;

/// AES-256-GCM output: IV plus ciphertext with the appended 16-byte tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// The 96-bit IV.
    pub iv: EncryptionNonce,
    /// Ciphertext followed by the authentication tag.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Result of [`encrypt_payload`]: the one-time key and the envelope.
#[derive(Debug)]
pub struct SealedPayload {
    /// Fresh random data key; wrap it for each party, then drop it.
    pub data_key: EncryptionKey,
    /// The encrypted payload.
    pub envelope: EncryptedEnvelope,
}

/// Encrypt a payload under a fresh random data key and IV.
pub fn encrypt_payload(plaintext: &[u8]) -> Result<SealedPayload> {
    let data_key = EncryptionKey::generate();
    let iv = EncryptionNonce::generate();
    let ciphertext = data_key.encrypt(plaintext, &iv)?;

    Ok(SealedPayload {
        data_key,
        envelope: EncryptedEnvelope { iv, ciphertext },
    })
}

/// Decrypt an envelope with its data key.
pub fn decrypt_payload(data_key: &EncryptionKey, envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
    data_key.decrypt(&envelope.ciphertext, &envelope.iv)
}
