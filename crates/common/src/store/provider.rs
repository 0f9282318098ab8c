use std::fmt::Debug;

use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
pub enum ByteStoreError {
    /// Unhandled error from the backing engine
    #[error("unhandled byte store error: {0}")]
    Backend(#[from] anyhow::Error),
    /// The store was closed and accepts no more reads or writes
    #[error("byte store is closed")]
    Closed,
}

/// An ordered key to bytes store
///
/// The content store sits on top of one of these and never needs to know
/// which engine is behind it. Implementations must make a single `put`
/// atomic: a reader either sees the whole value or nothing.
#[async_trait]
pub trait ByteStore: Send + Sync + Debug + 'static {
    /// Get the value stored under `key`
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - The stored value
    /// * `Ok(None)` - Nothing is stored under `key`
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ByteStoreError>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), ByteStoreError>;

    /// Release the backing engine. Later calls fail with `Closed`.
    async fn close(&self) -> Result<(), ByteStoreError>;

    async fn contains(&self, key: &[u8]) -> Result<bool, ByteStoreError> {
        Ok(self.get(key).await?.is_some())
    }
}
