use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use url::Url;

use super::client;
use super::messages::{Fetch, Message, Push, Reply};
use super::transport::{Transport, TransportError};
use crate::crypto::PublicKey;
use crate::directory::{DirectoryError, PartyDirectory};
use crate::enclave::{Enclave, EnclaveError};
use crate::key_manager::KeyManager;
use crate::record::{Digest, EncryptedRecord};
use crate::store::{ByteStore, ContentStore, ContentStoreError, MemoryByteStore};

/// Default bound on a single node-to-node request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
pub struct PeerBuilder {
    /// the address other nodes reach this one at
    address: Option<Url>,
    keys: Option<Arc<KeyManager>>,
    /// defaults to an in-memory store
    byte_store: Option<Arc<dyn ByteStore>>,
    transport: Option<Arc<dyn Transport>>,
    timeout: Option<Duration>,
    bootstrap: Vec<Url>,
}

impl PeerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: Url) -> Self {
        self.address = Some(address);
        self
    }

    pub fn keys(mut self, keys: Arc<KeyManager>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn byte_store(mut self, store: Arc<dyn ByteStore>) -> Self {
        self.byte_store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Peers to poll before anything has been learned by gossip
    pub fn bootstrap(mut self, peers: impl IntoIterator<Item = Url>) -> Self {
        self.bootstrap.extend(peers);
        self
    }

    pub fn build(self) -> Result<Peer, PeerError> {
        let address = self.address.ok_or(PeerError::MissingField("address"))?;
        let keys = self.keys.ok_or(PeerError::MissingField("keys"))?;
        let transport = self.transport.ok_or(PeerError::MissingField("transport"))?;
        let byte_store = self
            .byte_store
            .unwrap_or_else(|| Arc::new(MemoryByteStore::new()));
        let timeout = self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let directory = PartyDirectory::new(address, transport, timeout);
        directory.register_local(keys.public_keys().copied());
        for peer in self.bootstrap {
            if &peer != directory.self_address() {
                directory.add_peer(peer);
            }
        }

        let enclave = Enclave::new(keys, ContentStore::new(byte_store));
        Ok(Peer {
            enclave,
            directory: Arc::new(directory),
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PeerError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("enclave error: {0}")]
    Enclave(#[from] EnclaveError),
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("content store error: {0}")]
    Store(#[from] ContentStoreError),
    /// No peer we asked holds the record
    #[error("record {0} not found")]
    RecordNotFound(Digest),
    #[error("unexpected {0} reply")]
    UnexpectedReply(&'static str),
}

impl PeerError {
    pub fn is_cannot_decrypt(&self) -> bool {
        matches!(self, PeerError::Enclave(e) if e.is_cannot_decrypt())
    }
}

/// A privacy node: the enclave plus the directory it uses to find records
///  it does not hold and to deliver the ones it seals.
#[derive(Debug, Clone)]
pub struct Peer {
    enclave: Enclave,
    directory: Arc<PartyDirectory>,
}

impl Peer {
    pub fn builder() -> PeerBuilder {
        PeerBuilder::new()
    }

    pub fn enclave(&self) -> &Enclave {
        &self.enclave
    }

    pub fn directory(&self) -> &Arc<PartyDirectory> {
        &self.directory
    }

    pub fn store(&self) -> &ContentStore {
        self.enclave.store()
    }

    pub fn keys(&self) -> &Arc<KeyManager> {
        self.enclave.keys()
    }

    pub fn address(&self) -> &Url {
        self.directory.self_address()
    }

    /// Seal `payload` for `to`, store it and push it to remote recipients
    ///
    /// `from` picks the sending key; the first local key is used when it is
    /// absent. Delivery is best effort: a recipient node that cannot be
    /// reached can still fetch the record later.
    pub async fn send(
        &self,
        payload: &[u8],
        from: Option<&PublicKey>,
        to: &[PublicKey],
    ) -> Result<Digest, PeerError> {
        let sender = self.enclave.sender(from)?;
        let (digest, record) = self.enclave.encrypt_record(payload, to, sender).await?;
        self.push(&digest, record).await;
        Ok(digest)
    }

    /// Decrypt the record under `digest` for local key `to`
    ///
    /// When the record is not held locally it is fetched first, from the
    /// node owning `from` if given or else from every reachable peer in
    /// turn. The fetched record is only stored once it hashes to `digest`.
    pub async fn receive(
        &self,
        digest: &Digest,
        to: Option<&PublicKey>,
        from: Option<&PublicKey>,
    ) -> Result<Vec<u8>, PeerError> {
        let recipient = match to {
            Some(key) => *key,
            None => self.keys().default_key().public,
        };

        match self.enclave.decrypt(digest, &recipient).await {
            Err(EnclaveError::RecordNotFound(_)) => {
                tracing::debug!(%digest, "record not held locally, fetching");
                let record = self.fetch(digest, from).await?;
                Ok(self.enclave.open(&record, &recipient)?)
            }
            result => Ok(result?),
        }
    }

    /// Fetch a record from other nodes and store it locally
    pub async fn fetch(
        &self,
        digest: &Digest,
        from: Option<&PublicKey>,
    ) -> Result<EncryptedRecord, PeerError> {
        let candidates = match from {
            Some(sender) => vec![self.directory.lookup(sender)?],
            None => self.directory.reachable_peers(),
        };

        for address in candidates {
            if &address == self.address() {
                continue;
            }

            let record = match self.fetch_from(&address, digest).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(%address, %digest, "fetch failed: {}", e);
                    continue;
                }
            };

            match self.store().put_verified(digest, &record).await {
                Ok(_) => {
                    tracing::info!(%address, %digest, "fetched record");
                    return Ok(record);
                }
                Err(ContentStoreError::DigestMismatch { actual, .. }) => {
                    tracing::warn!(%address, %digest, %actual, "peer returned wrong record");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PeerError::RecordNotFound(*digest))
    }

    async fn fetch_from(
        &self,
        address: &Url,
        digest: &Digest,
    ) -> Result<Option<EncryptedRecord>, PeerError> {
        let message = Message::Fetch(Fetch { digest: *digest });
        match self.request(address, &message).await? {
            Reply::Fetch(reply) => Ok(reply.record),
            other => Err(PeerError::UnexpectedReply(other.kind())),
        }
    }

    /// Deliver a record to every remote node hosting one of its recipients
    async fn push(&self, digest: &Digest, record: EncryptedRecord) {
        let mut addresses = BTreeSet::new();
        for recipient in record.recipients() {
            if self.keys().is_local(recipient) {
                continue;
            }
            match self.directory.resolve(recipient) {
                Some(address) if &address != self.address() => {
                    addresses.insert(address);
                }
                Some(_) => {}
                None => tracing::warn!(%recipient, %digest, "no address known for recipient"),
            }
        }
        if addresses.is_empty() {
            return;
        }

        let message = Message::Push(Push { record });
        let mut pushes: FuturesUnordered<_> = addresses
            .into_iter()
            .map(|address| {
                let message = &message;
                async move {
                    let result = self.request(&address, message).await;
                    (address, result)
                }
            })
            .collect();

        while let Some((address, result)) = pushes.next().await {
            match result {
                Ok(Reply::Push(reply)) if &reply.digest == digest => {
                    tracing::debug!(%address, %digest, "pushed record");
                }
                Ok(other) => {
                    tracing::warn!(%address, %digest, "unexpected {} reply to push", other.kind());
                }
                Err(e) => tracing::warn!(%address, %digest, "push failed: {}", e),
            }
        }
    }

    async fn request(&self, address: &Url, message: &Message) -> Result<Reply, TransportError> {
        client::request(
            self.directory.transport().as_ref(),
            address,
            message,
            self.directory.timeout(),
        )
        .await
    }
}
