//! Persisted local key material.
//!
//! One [`StoredKey`] per address, in the same JSON shape a browser stores
//! after `crypto.subtle.exportKey('jwk', ...)`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{P256PublicKey, P256SecretKey};
use crate::error::{CryptoError, Result};

/// A P-256 key pair in its persisted form.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKey {
    /// Uncompressed public key, `0x04...` hex.
    pub public_key_hex: P256PublicKey,
    /// Private key as a JWK object.
    pub private_key_jwk: serde_json::Value,
    /// Key version, as published to the registry.
    pub version: u32,
}

impl StoredKey {
    /// Generate a fresh pair in persisted form.
    pub fn generate(version: u32) -> Result<Self> {
        Self::from_secret(&P256SecretKey::generate(), version)
    }

    /// Capture an existing private key.
    pub fn from_secret(secret: &P256SecretKey, version: u32) -> Result<Self> {
        let jwk = secret.to_jwk_string();
        let private_key_jwk = serde_json::from_str(&jwk)
            .map_err(|e| CryptoError::Encoding(format!("jwk: {}", e)))?;

        Ok(Self {
            public_key_hex: secret.public_key(),
            private_key_jwk,
            version,
        })
    }

    /// Recover the private key, checking it matches the stored public key.
    pub fn to_secret(&self) -> Result<P256SecretKey> {
        let jwk = zeroize::Zeroizing::new(self.private_key_jwk.to_string());
        let secret = P256SecretKey::from_jwk_str(&jwk)?;

        if secret.public_key() != self.public_key_hex {
            return Err(CryptoError::InvalidSecretKey(
                "private key does not match stored public key".to_string(),
            ));
        }
        Ok(secret)
    }

    /// The public half.
    pub fn public_key(&self) -> &P256PublicKey {
        &self.public_key_hex
    }
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("public_key_hex", &self.public_key_hex)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
