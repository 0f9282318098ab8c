use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{Nonce, PublicKey, SealedKey};

/// Size of a BLAKE3 digest in bytes (256 bits)
pub const DIGEST_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
    #[error("record codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Content address of an [`EncryptedRecord`]
///
/// The BLAKE3 hash of the ciphertext body only. Sealed keys are not
/// covered, so any two nodes holding the same ciphertext agree on the
/// digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    pub fn of(ciphertext: &[u8]) -> Self {
        Digest(*blake3::hash(ciphertext).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, RecordError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|e| RecordError::InvalidDigest(e.to_string()))?;
        Ok(Digest(buff))
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Digest(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = RecordError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// A sealed payload as persisted by the content store
///
/// Immutable once created. `sealed_keys` keeps the recipient order the
/// payload was sealed in, one entry per distinct recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub ciphertext: Vec<u8>,
    pub payload_nonce: Nonce,
    pub sender: PublicKey,
    pub sealed_keys: Vec<SealedKey>,
}

impl EncryptedRecord {
    /// Content address of this record
    pub fn digest(&self) -> Digest {
        Digest::of(&self.ciphertext)
    }

    /// The sealed key addressed to `recipient`, if this record has one
    pub fn sealed_key_for(&self, recipient: &PublicKey) -> Option<&SealedKey> {
        self.sealed_keys
            .iter()
            .find(|sealed| &sealed.recipient == recipient)
    }

    pub fn recipients(&self) -> impl Iterator<Item = &PublicKey> {
        self.sealed_keys.iter().map(|sealed| &sealed.recipient)
    }

    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{Secret, SecretKey};

    fn record_for(recipients: &[PublicKey]) -> EncryptedRecord {
        let sender = SecretKey::generate().unwrap();
        let secret = Secret::generate().unwrap();
        let payload_nonce = Nonce::generate().unwrap();
        EncryptedRecord {
            ciphertext: secret.encrypt(&payload_nonce, b"payload", &[]).unwrap(),
            payload_nonce,
            sender: sender.public(),
            sealed_keys: recipients
                .iter()
                .map(|r| SealedKey::seal(&secret, &sender, r).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_digest_ignores_sealed_keys() {
        let bob = SecretKey::generate().unwrap().public();
        let carol = SecretKey::generate().unwrap().public();
        let record = record_for(&[bob, carol]);

        let mut trimmed = record.clone();
        trimmed.sealed_keys.truncate(1);

        assert_eq!(record.digest(), trimmed.digest());
        assert_eq!(record.digest(), Digest::of(&record.ciphertext));
        assert_eq!(record.digest().as_bytes().len(), DIGEST_SIZE);
    }

    #[test]
    fn test_sealed_key_lookup_keeps_order() {
        let bob = SecretKey::generate().unwrap().public();
        let carol = SecretKey::generate().unwrap().public();
        let record = record_for(&[bob, carol]);

        assert_eq!(record.recipients().copied().collect::<Vec<_>>(), vec![bob, carol]);
        assert_eq!(record.sealed_key_for(&carol).unwrap().recipient, carol);
        assert!(record
            .sealed_key_for(&SecretKey::generate().unwrap().public())
            .is_none());
    }

    #[test]
    fn test_record_codec() {
        let bob = SecretKey::generate().unwrap().public();
        let record = record_for(&[bob]);
        let decoded = EncryptedRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(record, decoded);
        assert!(EncryptedRecord::decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_digest_hex() {
        let digest = Digest::of(b"ciphertext");
        assert_eq!(digest.to_string().parse::<Digest>().unwrap(), digest);
        assert!("zz".parse::<Digest>().is_err());
    }
}
