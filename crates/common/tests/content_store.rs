//! Integration tests for the content store's write discipline

use std::sync::Arc;

use common::crypto::{Nonce, SecretKey};
use common::record::EncryptedRecord;
use common::store::{ContentStore, ContentStoreError, MemoryByteStore};

fn record(ciphertext: &[u8]) -> EncryptedRecord {
    EncryptedRecord {
        ciphertext: ciphertext.to_vec(),
        payload_nonce: Nonce::generate().unwrap(),
        sender: SecretKey::generate().unwrap().public(),
        sealed_keys: vec![],
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_puts_write_once() {
    let bytes = MemoryByteStore::new();
    let store = ContentStore::new(Arc::new(bytes.clone()));
    let record = record(b"burst");

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let store = store.clone();
            let record = record.clone();
            tokio::spawn(async move { store.put(&record).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), record.digest());
    }
    assert_eq!(bytes.write_count(), 1);
    assert_eq!(store.get(&record.digest()).await.unwrap(), Some(record));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_digests_each_written() {
    let bytes = MemoryByteStore::new();
    let store = ContentStore::new(Arc::new(bytes.clone()));

    let handles: Vec<_> = (0..32u8)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.put(&record(&[i; 8])).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(bytes.write_count(), 32);
    assert_eq!(bytes.len(), 32);
}

#[tokio::test]
async fn test_same_ciphertext_different_record_rejected() {
    let store = ContentStore::new(Arc::new(MemoryByteStore::new()));
    let first = record(b"same ciphertext");
    let second = record(b"same ciphertext");
    assert_eq!(first.digest(), second.digest());

    store.put(&first).await.unwrap();
    assert!(matches!(
        store.put(&second).await,
        Err(ContentStoreError::Conflict(_))
    ));
    // sequential re-put of the original still succeeds
    assert_eq!(store.put(&first).await.unwrap(), first.digest());
    assert_eq!(store.get(&first.digest()).await.unwrap(), Some(first));
}
