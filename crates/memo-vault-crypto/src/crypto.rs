//! Key types and primitives.
//!
//! Provides P-256 key agreement and AES-256-GCM authenticated encryption.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::encoding;
use crate::error::{CryptoError, Result};

/// Length of an uncompressed SEC1 P-256 point.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length of symmetric keys and P-256 scalars.
pub const KEY_LEN: usize = 32;

/// Length of an AES-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// A P-256 public key.
///
/// Exchanged as an uncompressed SEC1 point: 65 bytes starting with `0x04`,
/// rendered as `0x`-prefixed hex.
#[derive(Clone, PartialEq, Eq)]
pub struct P256PublicKey(PublicKey);

impl P256PublicKey {
    /// Parse an uncompressed SEC1 point.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != 0x04 {
            return Err(CryptoError::InvalidPublicKey(format!(
                "expected {} byte uncompressed point, got {} bytes",
                PUBLIC_KEY_LEN,
                bytes.len()
            )));
        }
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey("point is not on the curve".to_string()))
    }

    /// Encode as an uncompressed SEC1 point.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Encode as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_sec1_bytes()))
    }

    /// Parse from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| CryptoError::Encoding(format!("hex: {}", e)))?;
        Self::from_sec1_bytes(&bytes)
    }

    fn as_affine(&self) -> &p256::AffinePoint {
        self.0.as_affine()
    }
}

impl fmt::Debug for P256PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P256PublicKey({}..)", &self.to_hex()[..14])
    }
}

impl Serialize for P256PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for P256PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A P-256 private key used only for key agreement.
#[derive(Clone)]
pub struct P256SecretKey(SecretKey);

impl P256SecretKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self(SecretKey::random(&mut OsRng))
    }

    /// Create from a raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSecretKey("scalar out of range".to_string()))
    }

    /// Export the raw scalar.
    pub fn to_bytes(&self) -> Zeroizing<[u8; KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; KEY_LEN]);
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    /// Import from a JWK string (`kty: EC`, `crv: P-256`).
    pub fn from_jwk_str(jwk: &str) -> Result<Self> {
        SecretKey::from_jwk_str(jwk)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSecretKey("unusable P-256 JWK".to_string()))
    }

    /// Export as a JWK string.
    pub fn to_jwk_string(&self) -> Zeroizing<String> {
        self.0.to_jwk_string()
    }

    /// Derive the public key.
    pub fn public_key(&self) -> P256PublicKey {
        P256PublicKey(self.0.public_key())
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &P256PublicKey) -> SharedKey {
        let shared =
            p256::ecdh::diffie_hellman(self.0.to_nonzero_scalar(), peer_public.as_affine());
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(shared.raw_secret_bytes());
        SharedKey(bytes)
    }
}

impl fmt::Debug for P256SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("P256SecretKey(..)")
    }
}

/// Generate a fresh P-256 key pair.
pub fn generate_key_pair() -> (P256SecretKey, P256PublicKey) {
    let secret = P256SecretKey::generate();
    let public = secret.public_key();
    (secret, public)
}

/// A shared secret from ECDH: the 32-byte x-coordinate.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_LEN]);

impl SharedKey {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Expand this secret into a 256-bit symmetric key with HKDF-SHA256.
    pub fn derive_key(&self, salt: &[u8], info: &[u8]) -> Result<EncryptionKey> {
        let hk = Hkdf::<Sha256>::new(Some(salt), &self.0);
        let mut okm = [0u8; KEY_LEN];
        hk.expand(info, &mut okm)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let key = EncryptionKey(okm);
        okm.zeroize();
        Ok(key)
    }
}

/// A 256-bit key for AES-256-GCM.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encrypt data with this key. The output carries the 16-byte tag.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))
    }

    /// Decrypt and authenticate data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// A 96-bit AES-GCM nonce, carried on the wire as base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionNonce(pub [u8; NONCE_LEN]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// Encode as base64.
    pub fn to_base64(&self) -> String {
        encoding::encode(&self.0)
    }

    /// Decode from base64; the decoded value must be 12 bytes.
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = encoding::decode(s)?;
        let arr: [u8; NONCE_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: NONCE_LEN,
                actual: bytes.len(),
            }
        })?;
        Ok(Self(arr))
    }
}

impl Serialize for EncryptionNonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for EncryptionNonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
