//! Payload encryption using ChaCha20-Poly1305
//!
//! Every sealed payload gets its own random `Secret` (the master key of the
//! envelope) and its own random `Nonce`. The secret is then wrapped once per
//! recipient by [`super::SealedKey`], so the payload itself is only encrypted
//! once no matter how many recipients there are.

use std::fmt;
use std::ops::Deref;

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce as ChaChaNonce,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("random source unavailable: {0}")]
    Random(getrandom::Error),
}

/// A 96-bit nonce, unique per encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce([u8; NONCE_SIZE]);

impl From<[u8; NONCE_SIZE]> for Nonce {
    fn from(bytes: [u8; NONCE_SIZE]) -> Self {
        Nonce(bytes)
    }
}

impl Deref for Nonce {
    type Target = [u8; NONCE_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Nonce {
    /// Draw a fresh random nonce
    ///
    /// # Errors
    ///
    /// Fails if the random source is unavailable. This is not retried.
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut buff).map_err(SecretError::Random)?;
        Ok(Self(buff))
    }

    fn as_chacha(&self) -> &ChaChaNonce {
        ChaChaNonce::from_slice(&self.0)
    }
}

/// A 256-bit symmetric key
///
/// Used both as the per-payload master key and, internally, as the key
/// encryption key derived for a sender/recipient pair. Zeroed on drop.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate()?;
/// let nonce = Nonce::generate()?;
///
/// let ciphertext = secret.encrypt(&nonce, b"sensitive data", &[])?;
/// let recovered = secret.decrypt(&nonce, &ciphertext, &[])?;
/// assert_eq!(b"sensitive data", &recovered[..]);
/// ```
#[derive(PartialEq, Eq, Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"<redacted>").finish()
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using the operating system RNG
    ///
    /// # Errors
    ///
    /// Fails if the random source is unavailable. This is not retried.
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).map_err(SecretError::Random)?;
        Ok(Self(buff))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.bytes()))
    }

    /// Encrypt data using ChaCha20-Poly1305 AEAD
    ///
    /// The output is `ciphertext || auth_tag (16 bytes)`. The nonce is not
    /// included and must be stored alongside by the caller. `aad` is
    /// authenticated but not encrypted.
    pub fn encrypt(&self, nonce: &Nonce, data: &[u8], aad: &[u8]) -> Result<Vec<u8>, SecretError> {
        let payload = Payload { msg: data, aad };
        let ciphertext = self
            .cipher()
            .encrypt(nonce.as_chacha(), payload)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;
        Ok(ciphertext)
    }

    /// Decrypt data using ChaCha20-Poly1305 AEAD
    ///
    /// # Errors
    ///
    /// Returns an error if the authentication tag does not verify (tampered
    /// data, truncated data, wrong key, wrong nonce or wrong `aad`). No
    /// plaintext is ever returned in that case.
    pub fn decrypt(&self, nonce: &Nonce, data: &[u8], aad: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < TAG_SIZE {
            return Err(anyhow::anyhow!("data too short for authentication tag").into());
        }

        let payload = Payload { msg: data, aad };
        let plaintext = self
            .cipher()
            .decrypt(nonce.as_chacha(), payload)
            .map_err(|_| anyhow::anyhow!("decrypt error"))?;
        Ok(plaintext)
    }
}
