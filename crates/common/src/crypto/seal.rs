//! Per-recipient sealing of a payload secret using X25519 + ChaCha20-Poly1305
//!
//! # Protocol Overview
//!
//! To seal a secret for a recipient:
//! 1. **Key agreement**: X25519 between the sender's private key and the
//!    recipient's public key
//! 2. **Derive KEK**: BLAKE3 `derive_key` over the shared point
//! 3. **Wrap**: ChaCha20-Poly1305 encrypts the secret under the KEK with a
//!    fresh nonce, binding both public keys as associated data
//!
//! The recipient repeats the agreement with their private key and the
//! sender's public key, derives the same KEK and unwraps.
//!
//! # Security Properties
//!
//! - **Confidentiality**: only the holder of the recipient private key (or the
//!   sender) can derive the KEK
//! - **Sender authentication**: a seal only opens against the sender public
//!   key it was made with
//! - **Integrity**: the AEAD tag rejects any modified seal

use serde::{Deserialize, Serialize};

use super::keys::{PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::{Nonce, Secret, SecretError, SECRET_SIZE, TAG_SIZE};

/// Size of a wrapped secret in bytes
///
/// Layout: encrypted_secret (32) || tag (16) = 48 bytes
pub const SEALED_SECRET_SIZE: usize = SECRET_SIZE + TAG_SIZE;

/// Domain separation context for the key encryption key
const KEK_CONTEXT: &str = "veil 2025-01-01 sealed key v1";

/// Errors that can occur while sealing or unsealing
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("seal error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// The wrapped bytes of a secret
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SealedSecret(pub(crate) [u8; SEALED_SECRET_SIZE]);

impl Serialize for SealedSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for SealedSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};
        use std::fmt;

        struct SealedVisitor;

        impl<'de> Visitor<'de> for SealedVisitor {
            type Value = SealedSecret;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte array or sequence of SEALED_SECRET_SIZE")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: Error,
            {
                SealedSecret::try_from(v).map_err(|_| {
                    E::invalid_length(
                        v.len(),
                        &format!("expected {} bytes", SEALED_SECRET_SIZE).as_str(),
                    )
                })
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::with_capacity(SEALED_SECRET_SIZE);
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                SealedSecret::try_from(bytes.as_slice()).map_err(|_| {
                    A::Error::invalid_length(
                        bytes.len(),
                        &format!("expected {} bytes", SEALED_SECRET_SIZE).as_str(),
                    )
                })
            }
        }

        // Try bytes first (for bincode), fallback to seq (for JSON)
        deserializer.deserialize_byte_buf(SealedVisitor)
    }
}

impl TryFrom<&[u8]> for SealedSecret {
    type Error = SealError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != SEALED_SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid sealed secret size, expected {}, got {}",
                SEALED_SECRET_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; SEALED_SECRET_SIZE];
        buff.copy_from_slice(bytes);
        Ok(SealedSecret(buff))
    }
}

impl SealedSecret {
    /// Get a reference to the raw sealed bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A payload secret sealed for exactly one recipient
///
/// Produced once per (payload, recipient) pair and never modified.
///
/// # Examples
///
/// ```ignore
/// // Alice seals a payload secret for Bob
/// let secret = Secret::generate()?;
/// let sealed = SealedKey::seal(&secret, &alice_secret_key, &bob_public_key)?;
///
/// // Bob recovers it with his private key
/// let recovered = sealed.unseal(&bob_secret_key)?;
/// assert_eq!(secret, recovered);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    pub recipient: PublicKey,
    pub sender: PublicKey,
    pub nonce: Nonce,
    pub sealed: SealedSecret,
}

impl SealedKey {
    /// Seal `secret` so that only `recipient` can recover it, knowing the
    /// sender public key
    ///
    /// # Errors
    ///
    /// Returns an error if the random source is unavailable, or if the
    /// recipient key is a low-order point that yields no shared secret.
    pub fn seal(
        secret: &Secret,
        sender: &SecretKey,
        recipient: &PublicKey,
    ) -> Result<Self, SealError> {
        let sender_public = sender.public();
        let nonce = Nonce::generate()?;
        let kek = derive_kek(sender, recipient)?;

        let wrapped = kek.encrypt(
            &nonce,
            secret.bytes(),
            &associated_data(&sender_public, recipient),
        )?;
        let sealed = SealedSecret::try_from(wrapped.as_slice())?;

        Ok(Self {
            recipient: *recipient,
            sender: sender_public,
            nonce,
            sealed,
        })
    }

    /// Recover the secret using the recipient's private key
    ///
    /// # Errors
    ///
    /// Returns an error if the seal was made for a different recipient, by a
    /// different sender than the one recorded, or was modified.
    pub fn unseal(&self, recipient_secret: &SecretKey) -> Result<Secret, SealError> {
        let kek = derive_kek(recipient_secret, &self.sender)?;
        let unwrapped = kek.decrypt(
            &self.nonce,
            self.sealed.bytes(),
            &associated_data(&self.sender, &self.recipient),
        )?;
        Ok(Secret::from_slice(&unwrapped)?)
    }
}

fn derive_kek(local: &SecretKey, remote: &PublicKey) -> Result<Secret, SealError> {
    let shared = local.diffie_hellman(remote);
    if !shared.was_contributory() {
        return Err(anyhow::anyhow!("non-contributory key agreement").into());
    }
    Ok(Secret::from(blake3::derive_key(KEK_CONTEXT, shared.as_bytes())))
}

fn associated_data(sender: &PublicKey, recipient: &PublicKey) -> [u8; 2 * PUBLIC_KEY_SIZE] {
    let mut aad = [0u8; 2 * PUBLIC_KEY_SIZE];
    aad[..PUBLIC_KEY_SIZE].copy_from_slice(sender.as_bytes());
    aad[PUBLIC_KEY_SIZE..].copy_from_slice(recipient.as_bytes());
    aad
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seal_unseal() {
        let secret = Secret::from_slice(&[42u8; SECRET_SIZE]).unwrap();
        let sender = SecretKey::generate().unwrap();
        let recipient = SecretKey::generate().unwrap();

        let sealed = SealedKey::seal(&secret, &sender, &recipient.public()).unwrap();
        assert_eq!(sealed.sender, sender.public());
        assert_eq!(sealed.recipient, recipient.public());

        let recovered = sealed.unseal(&recipient).unwrap();
        assert_eq!(secret, recovered);
    }

    #[test]
    fn test_unseal_with_wrong_key_fails() {
        let secret = Secret::generate().unwrap();
        let sender = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap();
        let eve = SecretKey::generate().unwrap();

        let sealed = SealedKey::seal(&secret, &sender, &bob.public()).unwrap();
        assert!(sealed.unseal(&eve).is_err());
    }

    #[test]
    fn test_unseal_with_swapped_sender_fails() {
        let secret = Secret::generate().unwrap();
        let sender = SecretKey::generate().unwrap();
        let impostor = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap();

        let mut sealed = SealedKey::seal(&secret, &sender, &bob.public()).unwrap();
        sealed.sender = impostor.public();
        assert!(sealed.unseal(&bob).is_err());
    }

    #[test]
    fn test_corrupted_seal_fails() {
        let secret = Secret::generate().unwrap();
        let sender = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap();

        let mut sealed = SealedKey::seal(&secret, &sender, &bob.public()).unwrap();
        sealed.sealed.0[0] ^= 0x80;
        assert!(sealed.unseal(&bob).is_err());
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let secret = Secret::generate().unwrap();
        let sender = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap().public();

        let first = SealedKey::seal(&secret, &sender, &bob).unwrap();
        let second = SealedKey::seal(&secret, &sender, &bob).unwrap();
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.sealed, second.sealed);
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        let secret = Secret::generate().unwrap();
        let sender = SecretKey::generate().unwrap();
        let identity_point = PublicKey::from([0u8; PUBLIC_KEY_SIZE]);
        assert!(SealedKey::seal(&secret, &sender, &identity_point).is_err());
    }

    #[test]
    fn test_sealed_key_serde_roundtrip() {
        let secret = Secret::generate().unwrap();
        let sender = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap();
        let sealed = SealedKey::seal(&secret, &sender, &bob.public()).unwrap();

        let json = serde_json::to_string(&sealed).unwrap();
        let from_json: SealedKey = serde_json::from_str(&json).unwrap();
        assert_eq!(sealed, from_json);

        let binary = bincode::serialize(&sealed).unwrap();
        let from_binary: SealedKey = bincode::deserialize(&binary).unwrap();
        assert_eq!(from_json, from_binary);
        assert_eq!(from_binary.unseal(&bob).unwrap(), secret);
    }

    #[test]
    fn test_sealed_secret_invalid_length() {
        let short_data = vec![0u8; SEALED_SECRET_SIZE - 1];
        let result: Result<SealedSecret, _> =
            bincode::deserialize(&bincode::serialize(&short_data).unwrap());
        assert!(result.is_err());
    }
}
