/**
 * Cryptographic types and operations.
 *  - X25519 identity keys
 *  - Per-payload symmetric secrets
 *  - Per-recipient sealing of those secrets
 */
pub mod crypto;
/**
 * Public key to address directory, kept in
 *  sync with other nodes by periodic gossip.
 */
pub mod directory;
/**
 * Multi-recipient envelope encryption over
 *  the content store.
 */
pub mod enclave;
/**
 * Loading, generating and owning the node's
 *  key pairs.
 */
pub mod key_manager;
/**
 * Node-to-node wire protocol, the abstract
 *  transport it rides on, and the `Peer` tying
 *  enclave and directory together.
 */
pub mod peer;
/**
 * The encrypted record and its content digest.
 */
pub mod record;
/**
 * Digest-keyed persistence over a pluggable
 *  ordered byte store.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::directory::{spawn_poller, DirectoryEntry, PartyDirectory, Reachability};
    pub use crate::enclave::{Enclave, EnclaveError};
    pub use crate::key_manager::{KeyManager, KeyPair};
    pub use crate::peer::{Peer, PeerError, Transport, TransportError};
    pub use crate::record::{Digest, EncryptedRecord};
    pub use crate::store::{ByteStore, ByteStoreError, ContentStore, MemoryByteStore};
    pub use crate::version::build_info;
}
