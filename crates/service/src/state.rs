use std::sync::Arc;

use common::key_manager::{KeyManager, KeyManagerError};
use common::peer::{Peer, PeerError};
use common::store::{ByteStore, MemoryByteStore};

use super::config::{Config, ConfigError, StorageConfig};
use super::database::{DatabaseSetupError, SqliteByteStore};
use super::transport::HttpTransport;

/// Main service state, shared by every request handler
#[derive(Debug, Clone)]
pub struct State {
    peer: Peer,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        config.validate()?;

        // 1. Load the node's keys
        let (private_keys, public_keys) = config.key_paths();
        let keys = Arc::new(KeyManager::load_files(&private_keys, &public_keys)?);
        for public in keys.public_keys() {
            tracing::info!(%public, "serving key");
        }

        // 2. Setup the record store
        let byte_store: Arc<dyn ByteStore> = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("using in-memory record store, records are lost on exit");
                Arc::new(MemoryByteStore::new())
            }
            StorageConfig::Sqlite { path } => {
                Arc::new(SqliteByteStore::open(&config.resolve(path)).await?)
            }
        };

        // 3. Build the peer over HTTP
        let transport = HttpTransport::new(config.request_timeout())?;
        let peer = Peer::builder()
            .address(config.url()?.clone())
            .keys(keys)
            .byte_store(byte_store)
            .transport(Arc::new(transport))
            .timeout(config.request_timeout())
            .bootstrap(config.other_nodes.iter().cloned())
            .build()?;

        tracing::info!(
            url = %peer.address(),
            peers = config.other_nodes.len(),
            "node state ready"
        );
        Ok(Self { peer })
    }

    pub fn new(peer: Peer) -> Self {
        Self { peer }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }
}

impl AsRef<Peer> for State {
    fn as_ref(&self) -> &Peer {
        &self.peer
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("key error: {0}")]
    Keys(#[from] KeyManagerError),
    #[error("database setup error: {0}")]
    Database(#[from] DatabaseSetupError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("peer setup error: {0}")]
    Peer(#[from] PeerError),
}
