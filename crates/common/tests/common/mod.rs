//! Shared test utilities for multi-node integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use url::Url;

use common::key_manager::{KeyManager, KeyPair};
use common::peer::{Peer, Transport, TransportError};
use common::store::MemoryByteStore;

pub const TIMEOUT: Duration = Duration::from_secs(1);

/// In-process network: requests are routed straight to the addressed peer's
///  message handler. Nodes can be taken down or slowed per address.
#[derive(Debug, Clone, Default)]
pub struct LoopbackNetwork {
    nodes: Arc<DashMap<Url, Peer>>,
    down: Arc<DashSet<Url>>,
    delays: Arc<DashMap<Url, Duration>>,
}

#[async_trait]
impl Transport for LoopbackNetwork {
    async fn send(&self, address: &Url, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        if self.down.contains(address) {
            return Err(TransportError::Unreachable(
                address.clone(),
                "connection refused".into(),
            ));
        }
        let delay = self.delays.get(address).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let peer = self
            .nodes
            .get(address)
            .map(|p| p.clone())
            .ok_or_else(|| TransportError::Unreachable(address.clone(), "no such host".into()))?;
        peer.handle_bytes(&request).await.map_err(TransportError::Codec)
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_down(&self, name: &str) {
        self.down.insert(url(name));
    }

    pub fn bring_up(&self, name: &str) {
        self.down.remove(&url(name));
    }

    pub fn slow_down(&self, name: &str, delay: Duration) {
        self.delays.insert(url(name), delay);
    }
}

/// A node on a loopback network, with a handle on its raw byte store
pub struct TestNode {
    pub peer: Peer,
    pub bytes: MemoryByteStore,
    pub keys: Vec<KeyPair>,
}

impl TestNode {
    pub fn key(&self) -> KeyPair {
        self.keys[0].clone()
    }
}

pub fn url(name: &str) -> Url {
    Url::parse(&format!("http://{}:9000", name)).unwrap()
}

pub fn keypair() -> KeyPair {
    KeyPair::generate().unwrap()
}

/// Start a node named `name` with one fresh key
pub fn spawn_node(network: &LoopbackNetwork, name: &str, bootstrap: &[&str]) -> TestNode {
    spawn_node_with_keys(network, name, vec![keypair()], bootstrap)
}

pub fn spawn_node_with_keys(
    network: &LoopbackNetwork,
    name: &str,
    keys: Vec<KeyPair>,
    bootstrap: &[&str],
) -> TestNode {
    let bytes = MemoryByteStore::new();
    let peer = Peer::builder()
        .address(url(name))
        .keys(Arc::new(KeyManager::new(keys.clone()).unwrap()))
        .byte_store(Arc::new(bytes.clone()))
        .transport(Arc::new(network.clone()))
        .timeout(TIMEOUT)
        .bootstrap(bootstrap.iter().map(|b| url(b)))
        .build()
        .unwrap();
    network.nodes.insert(url(name), peer.clone());
    TestNode { peer, bytes, keys }
}
