use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The peer could not be reached at all
    #[error("peer {0} unreachable: {1}")]
    Unreachable(Url, String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The peer answered, but not with a success status
    #[error("peer {0} responded with status {1}")]
    Status(Url, u16),
    #[error("message codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// The peer understood the request and refused it
    #[error("peer error: {0}")]
    Remote(String),
}

/// Request/response capability used to talk to other nodes
///
/// Implementations move opaque bytes; encoding lives in
/// [`super::messages`]. A single call is one round trip.
#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    async fn send(&self, address: &Url, request: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}
