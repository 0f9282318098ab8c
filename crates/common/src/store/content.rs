use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::provider::{ByteStore, ByteStoreError};
use crate::record::{Digest, EncryptedRecord, RecordError};

#[derive(thiserror::Error, Debug)]
pub enum ContentStoreError {
    #[error("byte store error: {0}")]
    Store(#[from] ByteStoreError),
    #[error("record codec error: {0}")]
    Codec(#[from] RecordError),
    /// A different record is already stored under this digest. Either a
    ///  hash collision or corruption; never resolved silently.
    #[error("integrity violation: different record already stored under {0}")]
    Conflict(Digest),
    /// A record fetched for one digest hashes to another
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: Digest, actual: Digest },
}

/// Digest-keyed record store with idempotent writes
///
/// Writers for the same digest are serialised through a lock that exists
/// only while someone holds it, so writes for distinct digests never wait on
/// each other. Readers take no lock at all: the backing store's `put` is
/// atomic, so a record is either fully visible or absent.
#[derive(Debug, Clone)]
pub struct ContentStore {
    store: Arc<dyn ByteStore>,
    locks: Arc<DashMap<Digest, Arc<Mutex<()>>>>,
}

/// A handle on the write lock for one digest
///
/// Dropping the last handle removes the lock from the map, also when the
/// owning `put` is cancelled while waiting or writing.
struct DigestLock<'a> {
    locks: &'a DashMap<Digest, Arc<Mutex<()>>>,
    digest: Digest,
    mutex: Arc<Mutex<()>>,
}

impl<'a> DigestLock<'a> {
    fn acquire(locks: &'a DashMap<Digest, Arc<Mutex<()>>>, digest: Digest) -> Self {
        let mutex = locks.entry(digest).or_default().clone();
        Self {
            locks,
            digest,
            mutex,
        }
    }
}

impl Drop for DigestLock<'_> {
    fn drop(&mut self) {
        drop(std::mem::take(&mut self.mutex));
        // only the map holds it now, nobody is waiting
        self.locks
            .remove_if(&self.digest, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ContentStore {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Persist a record under the digest of its ciphertext
    ///
    /// Storing a byte-identical record twice is a no-op that succeeds.
    /// Concurrent puts of the same record perform exactly one write.
    ///
    /// # Errors
    ///
    /// * `Conflict` if a different record already lives under the digest
    pub async fn put(&self, record: &EncryptedRecord) -> Result<Digest, ContentStoreError> {
        let digest = record.digest();
        let bytes = record.encode()?;

        let lock = DigestLock::acquire(&self.locks, digest);
        let _guard = lock.mutex.lock().await;
        self.write_once(&digest, bytes).await?;
        Ok(digest)
    }

    /// Persist a record that was requested as `expected`
    ///
    /// Used when the record came from another node: it is only stored if it
    /// really hashes to the digest that was asked for.
    pub async fn put_verified(
        &self,
        expected: &Digest,
        record: &EncryptedRecord,
    ) -> Result<Digest, ContentStoreError> {
        let actual = record.digest();
        if &actual != expected {
            return Err(ContentStoreError::DigestMismatch {
                expected: *expected,
                actual,
            });
        }
        self.put(record).await
    }

    pub async fn get(&self, digest: &Digest) -> Result<Option<EncryptedRecord>, ContentStoreError> {
        match self.store.get(digest.as_bytes()).await? {
            Some(bytes) => Ok(Some(EncryptedRecord::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn has(&self, digest: &Digest) -> Result<bool, ContentStoreError> {
        Ok(self.store.contains(digest.as_bytes()).await?)
    }

    pub async fn close(&self) -> Result<(), ContentStoreError> {
        Ok(self.store.close().await?)
    }

    async fn write_once(&self, digest: &Digest, bytes: Vec<u8>) -> Result<(), ContentStoreError> {
        if let Some(existing) = self.store.get(digest.as_bytes()).await? {
            if existing == bytes {
                tracing::debug!(%digest, "record already stored");
                return Ok(());
            }
            tracing::error!(%digest, "refusing to overwrite stored record");
            return Err(ContentStoreError::Conflict(*digest));
        }

        self.store.put(digest.as_bytes(), bytes).await?;
        tracing::debug!(%digest, "stored record");
        Ok(())
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.locks.len()
    }
}
