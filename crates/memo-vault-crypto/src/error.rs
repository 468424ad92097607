//! Error types for the crypto module.

use thiserror::Error;

/// Errors from key handling, key agreement and authenticated encryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// AEAD tag mismatch: tampered ciphertext, wrong key or wrong memo id.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// No local private key is available for the given identity.
    #[error("missing key material for {0}")]
    MissingKeyMaterial(String),

    /// Public key is not a valid uncompressed P-256 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Private key bytes or JWK could not be used.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// HKDF expansion failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Key material has the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Base64, hex or JSON decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Cipher could not encrypt.
    #[error("encryption failed: {0}")]
    EncryptionError(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
