use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::provider::{ByteStore, ByteStoreError};

/// In-memory byte store over an ordered map
#[derive(Debug, Clone, Default)]
pub struct MemoryByteStore {
    inner: Arc<MemoryByteStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryByteStoreInner {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
    /// Number of `put` calls that reached the map
    writes: AtomicUsize,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of physical writes performed so far
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .map(|entries| entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> Result<(), ByteStoreError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ByteStoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ByteStoreError> {
        self.ensure_open()?;
        let entries = self
            .inner
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), ByteStoreError> {
        self.ensure_open()?;
        let mut entries = self
            .inner
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e))?;
        entries.insert(key.to_vec(), value);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), ByteStoreError> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_put() {
        let store = MemoryByteStore::new();
        assert!(store.get(b"a").await.unwrap().is_none());
        assert!(!store.contains(b"a").await.unwrap());

        store.put(b"a", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get(b"a").await.unwrap(), Some(vec![1, 2, 3]));
        assert!(store.contains(b"a").await.unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let store = MemoryByteStore::new();
        store.put(b"a", vec![1]).await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(store.get(b"a").await, Err(ByteStoreError::Closed)));
        assert!(matches!(
            store.put(b"b", vec![2]).await,
            Err(ByteStoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryByteStore::new();
        let other = store.clone();
        other.put(b"k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"v".to_vec()));
    }
}
