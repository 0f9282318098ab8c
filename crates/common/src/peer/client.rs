use std::time::Duration;

use url::Url;

use super::messages::{Message, Reply};
use super::transport::{Transport, TransportError};

/// Send one message to the node at `address` and wait for its reply
///
/// The whole round trip is bounded by `timeout`. An `Error` reply from the
/// peer is turned into `TransportError::Remote`.
pub async fn request(
    transport: &dyn Transport,
    address: &Url,
    message: &Message,
    timeout: Duration,
) -> Result<Reply, TransportError> {
    let bytes = message.encode()?;
    tracing::trace!(%address, kind = message.kind(), len = bytes.len(), "sending message");

    let response = tokio::time::timeout(timeout, transport.send(address, bytes))
        .await
        .map_err(|_| TransportError::Timeout(timeout))??;

    match Reply::decode(&response)? {
        Reply::Error(reply) => Err(TransportError::Remote(reply.message)),
        reply => {
            tracing::trace!(%address, kind = reply.kind(), "received reply");
            Ok(reply)
        }
    }
}
