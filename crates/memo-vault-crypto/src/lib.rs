//! # Memo Vault Crypto
//!
//! Envelope encryption for memos.
//!
//! ## Overview
//!
//! A memo payload is encrypted once under a random one-time data key. That
//! data key is then wrapped separately for every authorized party:
//!
//! 1. ECDH on P-256 between the sender's private key and the party's public
//!    key yields a 32-byte shared secret (the x-coordinate).
//! 2. HKDF-SHA256 turns the secret into a wrap key, salted with the memo id
//!    and bound to the info string `tempo-memo-key`.
//! 3. AES-256-GCM encrypts the data key under the wrap key.
//!
//! Because ECDH is symmetric, a party unwraps with their own private key and
//! the sender's public key.
//!
//! ## Failure Semantics
//!
//! Every decryption fails closed: a tag mismatch surfaces as
//! [`CryptoError::AuthenticationFailed`] and never yields partial plaintext.
//! All functions are pure; no key is cached between calls.

pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod keywrap;

pub use crypto::{
    generate_key_pair, EncryptionKey, EncryptionNonce, P256PublicKey, P256SecretKey, SharedKey,
};
pub use envelope::{decrypt_payload, encrypt_payload, EncryptedEnvelope, SealedPayload};
pub use error::{CryptoError, Result};
pub use keys::StoredKey;
pub use keywrap::{decrypt_data_key, derive_wrap_key, encrypt_data_key_for, KeyWrap, WRAP_KEY_INFO};

/// Registry key type tag for P-256 ECDH keys.
pub const KEY_TYPE_P256: u8 = 1;

/// Algorithm identifiers carried inline by verbose memos.
pub mod algorithms {
    /// Key agreement.
    pub const KEY_ALG: &str = "ECDH-P256";
    /// Key derivation.
    pub const KDF: &str = "HKDF-SHA256";
    /// Symmetric cipher.
    pub const ENC_ALG: &str = "AES-256-GCM";
}
