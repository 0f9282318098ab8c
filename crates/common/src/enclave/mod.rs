//! Multi-recipient envelope encryption
//!
//! A payload is encrypted once under a fresh [`Secret`], and that secret is
//! sealed separately for every recipient. The resulting [`EncryptedRecord`]
//! is written to the [`ContentStore`] and only its [`Digest`] is handed back.
//!
//! The enclave never touches the network. When a digest is not held
//! locally, [`Enclave::decrypt`] reports `RecordNotFound` and the caller is
//! expected to fetch the record from a peer first.

use std::collections::HashSet;
use std::sync::Arc;

use crate::crypto::{Nonce, PublicKey, SealError, SealedKey, Secret, SecretError};
use crate::key_manager::{KeyManager, KeyPair};
use crate::record::{Digest, EncryptedRecord};
use crate::store::{ContentStore, ContentStoreError};

#[derive(Debug, thiserror::Error)]
pub enum EnclaveError {
    /// A payload sealed for nobody
    #[error("no recipients given")]
    NoRecipients,
    /// The named sender key is not held by this node
    #[error("sender key {0} is not a local key")]
    UnknownSender(PublicKey),
    #[error("record {0} not found")]
    RecordNotFound(Digest),
    /// The record carries no sealed key for the requested recipient
    #[error("not a recipient of this record")]
    NotARecipient,
    /// The recipient key is not one this node holds a private key for
    #[error("no private key for recipient")]
    MissingPrivateKey,
    #[error("failed to unseal payload key")]
    Unseal,
    #[error("failed to decrypt payload")]
    Decryption,
    #[error("payload encryption error: {0}")]
    Secret(#[from] SecretError),
    #[error("failed to seal payload key: {0}")]
    Seal(#[from] SealError),
    #[error("content store error: {0}")]
    Store(#[from] ContentStoreError),
}

impl EnclaveError {
    /// Failures that external callers only ever see as "cannot decrypt"
    pub fn is_cannot_decrypt(&self) -> bool {
        matches!(
            self,
            EnclaveError::NotARecipient
                | EnclaveError::MissingPrivateKey
                | EnclaveError::Unseal
                | EnclaveError::Decryption
        )
    }
}

#[derive(Debug, Clone)]
pub struct Enclave {
    keys: Arc<KeyManager>,
    store: ContentStore,
}

impl Enclave {
    pub fn new(keys: Arc<KeyManager>, store: ContentStore) -> Self {
        Self { keys, store }
    }

    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Pick the local keypair to send as, defaulting to the first loaded key
    pub fn sender(&self, from: Option<&PublicKey>) -> Result<&KeyPair, EnclaveError> {
        match from {
            Some(public) => self
                .keys
                .keypair(public)
                .ok_or(EnclaveError::UnknownSender(*public)),
            None => Ok(self.keys.default_key()),
        }
    }

    /// Encrypt `payload` for `recipients`, store it and return its digest
    ///
    /// Duplicate recipients are sealed for once, in first-occurrence order.
    ///
    /// # Errors
    ///
    /// * `NoRecipients` if `recipients` is empty
    /// * `Secret` if the random source is unavailable (not retried)
    pub async fn encrypt(
        &self,
        payload: &[u8],
        recipients: &[PublicKey],
        sender: &KeyPair,
    ) -> Result<Digest, EnclaveError> {
        let (digest, _) = self.encrypt_record(payload, recipients, sender).await?;
        Ok(digest)
    }

    /// Like [`Enclave::encrypt`], also handing back the stored record so it
    /// can be forwarded to recipient nodes
    pub async fn encrypt_record(
        &self,
        payload: &[u8],
        recipients: &[PublicKey],
        sender: &KeyPair,
    ) -> Result<(Digest, EncryptedRecord), EnclaveError> {
        let record = seal_record(payload, recipients, sender)?;
        let digest = self.store.put(&record).await?;
        tracing::debug!(
            %digest,
            recipients = record.sealed_keys.len(),
            "encrypted payload"
        );
        Ok((digest, record))
    }

    /// Decrypt the record stored under `digest` for a local recipient
    ///
    /// # Errors
    ///
    /// * `RecordNotFound` if the record is not held locally
    /// * `NotARecipient`, `MissingPrivateKey`, `Unseal`, `Decryption` when
    ///   the record cannot be opened by `recipient`
    pub async fn decrypt(
        &self,
        digest: &Digest,
        recipient: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        let record = self
            .store
            .get(digest)
            .await?
            .ok_or(EnclaveError::RecordNotFound(*digest))?;
        self.open(&record, recipient)
    }

    /// Open an already-loaded record. Pure CPU work, no store access.
    pub fn open(
        &self,
        record: &EncryptedRecord,
        recipient: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        let sealed = record
            .sealed_key_for(recipient)
            .ok_or(EnclaveError::NotARecipient)?;
        let pair = self
            .keys
            .keypair(recipient)
            .ok_or(EnclaveError::MissingPrivateKey)?;

        if sealed.sender != record.sender {
            return Err(EnclaveError::Unseal);
        }
        let secret = sealed
            .unseal(&pair.secret)
            .map_err(|_| EnclaveError::Unseal)?;

        secret
            .decrypt(
                &record.payload_nonce,
                &record.ciphertext,
                record.sender.as_bytes(),
            )
            .map_err(|_| EnclaveError::Decryption)
    }
}

/// Build the envelope for `payload` without storing it
pub fn seal_record(
    payload: &[u8],
    recipients: &[PublicKey],
    sender: &KeyPair,
) -> Result<EncryptedRecord, EnclaveError> {
    let recipients = dedup(recipients);
    if recipients.is_empty() {
        return Err(EnclaveError::NoRecipients);
    }

    let secret = Secret::generate()?;
    let payload_nonce = Nonce::generate()?;
    // the sender key is bound into the payload tag
    let ciphertext = secret.encrypt(&payload_nonce, payload, sender.public.as_bytes())?;

    let sealed_keys = recipients
        .iter()
        .map(|recipient| SealedKey::seal(&secret, &sender.secret, recipient))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EncryptedRecord {
        ciphertext,
        payload_nonce,
        sender: sender.public,
        sealed_keys,
    })
}

fn dedup(recipients: &[PublicKey]) -> Vec<PublicKey> {
    let mut seen = HashSet::with_capacity(recipients.len());
    recipients
        .iter()
        .filter(|recipient| seen.insert(**recipient))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryByteStore;

    fn enclave_with(pairs: Vec<KeyPair>) -> Enclave {
        let keys = Arc::new(KeyManager::new(pairs).unwrap());
        Enclave::new(keys, ContentStore::new(Arc::new(MemoryByteStore::new())))
    }

    #[tokio::test]
    async fn test_roundtrip_for_every_recipient() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let carol = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![alice.clone(), bob.clone(), carol.clone()]);

        let digest = enclave
            .encrypt(b"payload", &[bob.public, carol.public], &alice)
            .await
            .unwrap();

        assert_eq!(enclave.decrypt(&digest, &bob.public).await.unwrap(), b"payload");
        assert_eq!(enclave.decrypt(&digest, &carol.public).await.unwrap(), b"payload");
        assert!(matches!(
            enclave.decrypt(&digest, &alice.public).await,
            Err(EnclaveError::NotARecipient)
        ));
    }

    #[tokio::test]
    async fn test_no_recipients() {
        let alice = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![alice.clone()]);
        for payload in [&b""[..], b"x", b"a longer payload"] {
            assert!(matches!(
                enclave.encrypt(payload, &[], &alice).await,
                Err(EnclaveError::NoRecipients)
            ));
        }
    }

    #[tokio::test]
    async fn test_duplicate_recipients_sealed_once() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let carol = KeyPair::generate().unwrap();

        let record = seal_record(
            b"payload",
            &[bob.public, carol.public, bob.public],
            &alice,
        )
        .unwrap();
        assert_eq!(
            record.recipients().copied().collect::<Vec<_>>(),
            vec![bob.public, carol.public]
        );
    }

    #[tokio::test]
    async fn test_missing_record() {
        let alice = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![alice.clone()]);
        let digest = Digest::of(b"unknown");
        assert!(matches!(
            enclave.decrypt(&digest, &alice.public).await,
            Err(EnclaveError::RecordNotFound(d)) if d == digest
        ));
    }

    #[tokio::test]
    async fn test_recipient_without_private_key() {
        let alice = KeyPair::generate().unwrap();
        let remote = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![alice.clone()]);

        let digest = enclave.encrypt(b"payload", &[remote.public], &alice).await.unwrap();
        let err = enclave.decrypt(&digest, &remote.public).await.unwrap_err();
        assert!(matches!(err, EnclaveError::MissingPrivateKey));
        assert!(err.is_cannot_decrypt());
    }

    #[test]
    fn test_swapped_record_sender_fails() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![bob.clone()]);

        let mut record = seal_record(b"payload", &[bob.public], &alice).unwrap();
        record.sender = KeyPair::generate().unwrap().public;
        assert!(enclave.open(&record, &bob.public).unwrap_err().is_cannot_decrypt());
    }

    #[test]
    fn test_tampered_ciphertext() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![bob.clone()]);

        let mut record = seal_record(b"payload", &[bob.public], &alice).unwrap();
        record.ciphertext[0] ^= 0x01;
        assert!(matches!(
            enclave.open(&record, &bob.public),
            Err(EnclaveError::Decryption)
        ));
    }

    #[test]
    fn test_sender_selection() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let enclave = enclave_with(vec![alice.clone(), bob.clone()]);

        assert_eq!(enclave.sender(None).unwrap().public, alice.public);
        assert_eq!(enclave.sender(Some(&bob.public)).unwrap().public, bob.public);
        let stranger = KeyPair::generate().unwrap().public;
        assert!(matches!(
            enclave.sender(Some(&stranger)),
            Err(EnclaveError::UnknownSender(_))
        ));
    }
}
