//! Content-addressed persistence for encrypted records
//!
//! [`ContentStore`] keys every record by the digest of its ciphertext on top
//! of any [`ByteStore`] engine. It knows nothing about cryptography.

mod content;
mod memory;
mod provider;

pub use content::{ContentStore, ContentStoreError};
pub use memory::MemoryByteStore;
pub use provider::{ByteStore, ByteStoreError};
