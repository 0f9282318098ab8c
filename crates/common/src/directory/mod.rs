//! Public key to address directory, reconciled by gossip
//!
//! Every node keeps a map from public key to the address of the node holding
//! the matching private key. Nodes periodically swap their full maps with
//! every peer they know of and merge what they get back. The merge is
//! last-writer-wins by `last_seen`, so all nodes converge on the same map no
//! matter in which order exchanges happen.
//!
//! Entries are never removed. A stale address is still the best guess.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto::PublicKey;
use crate::peer::client;
use crate::peer::{Message, PartyInfo, Reply, Transport, TransportError};

mod poller;

pub use poller::spawn_poller;

#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    #[error("no address known for {0}")]
    NotFound(PublicKey),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unexpected {0} reply to party info")]
    UnexpectedReply(&'static str),
}

/// Binding of a public key to the address its node is reachable at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub public_key: PublicKey,
    pub address: Url,
    pub last_seen: DateTime<Utc>,
}

impl DirectoryEntry {
    /// Whether `self` replaces `other` for the same key
    ///
    /// Newer `last_seen` wins. Equal timestamps fall back to the greater
    /// address so the outcome does not depend on merge order; an identical
    /// entry never replaces itself.
    fn supersedes(&self, other: &DirectoryEntry) -> bool {
        (self.last_seen, &self.address) > (other.last_seen, &other.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// Never polled
    Unknown,
    Reachable,
    Unreachable,
}

/// Poll bookkeeping for one peer address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub address: Url,
    pub reachability: Reachability,
    pub last_attempt: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl PeerStatus {
    fn new(address: Url) -> Self {
        Self {
            address,
            reachability: Reachability::Unknown,
            last_attempt: None,
            consecutive_failures: 0,
        }
    }
}

/// Outcome of one [`PartyDirectory::poll_once`] cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub polled: usize,
    pub reachable: usize,
    pub unreachable: usize,
    /// Entries added or superseded during the cycle
    pub merged: usize,
}

#[derive(Debug)]
pub struct PartyDirectory {
    self_address: Url,
    local_keys: RwLock<HashSet<PublicKey>>,
    entries: DashMap<PublicKey, DirectoryEntry>,
    peers: DashMap<Url, PeerStatus>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl PartyDirectory {
    /// Create an empty directory for the node reachable at `self_address`
    ///
    /// `timeout` bounds every single request made while polling.
    pub fn new(self_address: Url, transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        let peers = DashMap::new();
        peers.insert(
            self_address.clone(),
            PeerStatus {
                reachability: Reachability::Reachable,
                ..PeerStatus::new(self_address.clone())
            },
        );

        Self {
            self_address,
            local_keys: RwLock::new(HashSet::new()),
            entries: DashMap::new(),
            peers,
            transport,
            timeout,
        }
    }

    pub fn self_address(&self) -> &Url {
        &self.self_address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Seed self entries for keys owned by this node
    ///
    /// Self entries always point at our own address and are never
    /// overwritten by a merge.
    pub fn register_local(&self, keys: impl IntoIterator<Item = PublicKey>) {
        let now = Utc::now();
        let mut local = self.local_keys.write();
        for public_key in keys {
            local.insert(public_key);
            self.entries.insert(
                public_key,
                DirectoryEntry {
                    public_key,
                    address: self.self_address.clone(),
                    last_seen: now,
                },
            );
            tracing::debug!(%public_key, "registered local key");
        }
    }

    pub fn is_local(&self, public_key: &PublicKey) -> bool {
        self.local_keys.read().contains(public_key)
    }

    /// Start tracking a peer address. Returns false if it was already known.
    pub fn add_peer(&self, address: Url) -> bool {
        if self.peers.contains_key(&address) {
            return false;
        }
        tracing::info!(%address, "discovered peer");
        self.peers
            .entry(address.clone())
            .or_insert_with(|| PeerStatus::new(address));
        true
    }

    /// Merge a set of entries into the directory
    ///
    /// Returns the number of entries that were added or superseded.
    pub fn merge(&self, incoming: impl IntoIterator<Item = DirectoryEntry>) -> usize {
        let mut changed = 0;
        for entry in incoming {
            if self.is_local(&entry.public_key) {
                continue;
            }
            if entry.address != self.self_address {
                self.add_peer(entry.address.clone());
            }

            match self.entries.entry(entry.public_key) {
                Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                    changed += 1;
                }
                Entry::Occupied(mut occupied) => {
                    if entry.supersedes(occupied.get()) {
                        occupied.insert(entry);
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Bump `last_seen` on every self entry
    pub fn refresh_local(&self) {
        let now = Utc::now();
        for public_key in self.local_keys.read().iter() {
            if let Some(mut entry) = self.entries.get_mut(public_key) {
                entry.last_seen = entry.last_seen.max(now);
            }
        }
    }

    /// Snapshot of every entry, ordered by public key
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.public_key.cmp(&b.public_key));
        entries
    }

    /// Snapshot of every known peer, ordered by address
    pub fn peers(&self) -> Vec<PeerStatus> {
        let mut peers: Vec<_> = self.peers.iter().map(|p| p.value().clone()).collect();
        peers.sort_by(|a, b| a.address.cmp(&b.address));
        peers
    }

    /// Remote peers worth asking for a record: reachable ones first, then
    /// ones never polled. Unreachable peers and ourselves are skipped.
    pub fn reachable_peers(&self) -> Vec<Url> {
        let mut candidates: Vec<_> = self
            .peers
            .iter()
            .filter(|p| p.key() != &self.self_address)
            .filter(|p| p.reachability != Reachability::Unreachable)
            .map(|p| (p.reachability != Reachability::Reachable, p.key().clone()))
            .collect();
        candidates.sort();
        candidates.into_iter().map(|(_, address)| address).collect()
    }

    pub fn resolve(&self, public_key: &PublicKey) -> Option<Url> {
        self.entries.get(public_key).map(|e| e.address.clone())
    }

    pub fn lookup(&self, public_key: &PublicKey) -> Result<Url, DirectoryError> {
        self.resolve(public_key)
            .ok_or(DirectoryError::NotFound(*public_key))
    }

    /// Answer a party info request from `sender`
    ///
    /// The sender is recorded as a reachable peer, its entries are merged
    /// and our full entry set is returned.
    pub fn exchange(&self, sender: Url, incoming: Vec<DirectoryEntry>) -> Vec<DirectoryEntry> {
        if sender != self.self_address {
            self.add_peer(sender.clone());
            self.mark(&sender, true);
        }
        let merged = self.merge(incoming);
        if merged > 0 {
            tracing::debug!(%sender, merged, "merged party info");
        }
        self.refresh_local();
        self.entries()
    }

    /// Exchange entries with every known peer except ourselves
    ///
    /// Peers are contacted concurrently and each reply is merged as soon as
    /// it arrives. A peer that fails or times out is marked unreachable and
    /// does not hold up the others.
    pub async fn poll_once(&self) -> PollReport {
        self.refresh_local();
        let message = Message::PartyInfo(PartyInfo {
            sender: self.self_address.clone(),
            entries: self.entries(),
        });

        let targets: Vec<Url> = self
            .peers
            .iter()
            .map(|p| p.key().clone())
            .filter(|address| address != &self.self_address)
            .collect();

        let mut report = PollReport {
            polled: targets.len(),
            ..PollReport::default()
        };

        let mut requests: FuturesUnordered<_> = targets
            .into_iter()
            .map(|address| {
                let message = &message;
                async move {
                    let result = self.poll_peer(&address, message).await;
                    (address, result)
                }
            })
            .collect();

        while let Some((address, result)) = requests.next().await {
            match result {
                Ok(merged) => {
                    report.reachable += 1;
                    report.merged += merged;
                    self.mark(&address, true);
                }
                Err(e) => {
                    tracing::warn!(%address, "party info exchange failed: {}", e);
                    report.unreachable += 1;
                    self.mark(&address, false);
                }
            }
        }

        tracing::debug!(
            polled = report.polled,
            reachable = report.reachable,
            unreachable = report.unreachable,
            merged = report.merged,
            "poll cycle complete"
        );
        report
    }

    async fn poll_peer(&self, address: &Url, message: &Message) -> Result<usize, DirectoryError> {
        match client::request(self.transport.as_ref(), address, message, self.timeout).await? {
            Reply::PartyInfo(reply) => Ok(self.merge(reply.entries)),
            other => Err(DirectoryError::UnexpectedReply(other.kind())),
        }
    }

    fn mark(&self, address: &Url, reachable: bool) {
        if let Some(mut status) = self.peers.get_mut(address) {
            status.last_attempt = Some(Utc::now());
            if reachable {
                if status.reachability != Reachability::Reachable {
                    tracing::info!(%address, "peer reachable");
                }
                status.reachability = Reachability::Reachable;
                status.consecutive_failures = 0;
            } else {
                if status.reachability != Reachability::Unreachable {
                    tracing::info!(%address, "peer unreachable");
                }
                status.reachability = Reachability::Unreachable;
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::crypto::SecretKey;

    /// Transport that fails every request
    #[derive(Debug)]
    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn send(&self, address: &Url, _: Vec<u8>) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Unreachable(address.clone(), "offline".into()))
        }
    }

    fn directory(address: &str) -> PartyDirectory {
        PartyDirectory::new(
            Url::parse(address).unwrap(),
            Arc::new(Offline),
            Duration::from_secs(1),
        )
    }

    fn key(seed: u8) -> PublicKey {
        SecretKey::from([seed; 32]).public()
    }

    fn entry(seed: u8, address: &str, secs: i64) -> DirectoryEntry {
        DirectoryEntry {
            public_key: key(seed),
            address: Url::parse(address).unwrap(),
            last_seen: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_newer_entry_wins() {
        let dir = directory("http://self:9000");
        dir.merge([entry(1, "http://a:9000", 10)]);
        assert_eq!(dir.merge([entry(1, "http://b:9000", 5)]), 0);
        assert_eq!(dir.resolve(&key(1)).unwrap().as_str(), "http://a:9000/");

        assert_eq!(dir.merge([entry(1, "http://b:9000", 20)]), 1);
        assert_eq!(dir.resolve(&key(1)).unwrap().as_str(), "http://b:9000/");
    }

    #[test]
    fn test_merge_commutative_and_idempotent() {
        let a = vec![entry(1, "http://a:9000", 10), entry(2, "http://a:9000", 10)];
        let b = vec![entry(1, "http://b:9000", 10), entry(2, "http://b:9000", 3)];

        let ab = directory("http://self:9000");
        ab.merge(a.clone());
        ab.merge(b.clone());

        let ba = directory("http://self:9000");
        ba.merge(b);
        ba.merge(a.clone());

        assert_eq!(ab.entries(), ba.entries());

        let once = directory("http://self:9000");
        once.merge(a.clone());
        let before = once.entries();
        assert_eq!(once.merge(a), 0);
        assert_eq!(once.entries(), before);
    }

    #[test]
    fn test_local_entries_not_overwritten() {
        let dir = directory("http://self:9000");
        dir.register_local([key(1)]);

        let forged = entry(1, "http://evil:9000", i64::from(i32::MAX));
        assert_eq!(dir.merge([forged]), 0);
        assert_eq!(dir.resolve(&key(1)).unwrap(), *dir.self_address());
        assert!(dir.is_local(&key(1)));
    }

    #[test]
    fn test_merge_discovers_peers() {
        let dir = directory("http://self:9000");
        dir.merge([entry(1, "http://a:9000", 1), entry(2, "http://self:9000", 1)]);

        let addresses: Vec<_> = dir.peers().into_iter().map(|p| p.address).collect();
        assert_eq!(addresses.len(), 2);
        assert_eq!(dir.reachable_peers(), vec![Url::parse("http://a:9000").unwrap()]);
    }

    #[test]
    fn test_exchange_returns_full_view() {
        let dir = directory("http://self:9000");
        dir.register_local([key(1)]);

        let reply = dir.exchange(
            Url::parse("http://a:9000").unwrap(),
            vec![entry(2, "http://a:9000", 1)],
        );
        assert_eq!(reply.len(), 2);
        let status = dir
            .peers()
            .into_iter()
            .find(|p| p.address.as_str() == "http://a:9000/")
            .unwrap();
        assert_eq!(status.reachability, Reachability::Reachable);
    }

    #[test]
    fn test_unknown_key() {
        let dir = directory("http://self:9000");
        assert!(dir.resolve(&key(9)).is_none());
        assert!(matches!(dir.lookup(&key(9)), Err(DirectoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_poll_marks_unreachable() {
        let dir = directory("http://self:9000");
        dir.add_peer(Url::parse("http://a:9000").unwrap());

        let report = dir.poll_once().await;
        assert_eq!(report.polled, 1);
        assert_eq!(report.unreachable, 1);

        let status = dir
            .peers()
            .into_iter()
            .find(|p| p.address.as_str() == "http://a:9000/")
            .unwrap();
        assert_eq!(status.reachability, Reachability::Unreachable);
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_attempt.is_some());
        assert!(dir.reachable_peers().is_empty());
    }
}
