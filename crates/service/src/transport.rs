use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use url::Url;

use common::peer::{Transport, TransportError};

/// Path of the node-to-node endpoint, relative to a node's base url
pub const PEER_PATH: &str = "peer";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The peer endpoint under a node's base url
///
/// The base path is kept whole, with or without a trailing slash.
pub fn peer_endpoint(address: &Url) -> Result<Url, url::ParseError> {
    if address.path().ends_with('/') {
        return address.join(PEER_PATH);
    }
    let mut base = address.clone();
    base.set_path(&format!("{}/", address.path()));
    base.join(PEER_PATH)
}

/// Node-to-node transport over HTTP POST
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, address: &Url, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let endpoint = peer_endpoint(address)
            .map_err(|e| TransportError::Unreachable(address.clone(), e.to_string()))?;

        let unreachable = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Unreachable(address.clone(), e.to_string())
            }
        };

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(request)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(address.clone(), status.as_u16()));
        }

        let body = response.bytes().await.map_err(unreachable)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(address: &str) -> String {
        peer_endpoint(&Url::parse(address).unwrap())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_peer_endpoint_keeps_base_path() {
        assert_eq!(endpoint("http://h:9000"), "http://h:9000/peer");
        assert_eq!(endpoint("http://h:9000/"), "http://h:9000/peer");
        assert_eq!(endpoint("http://h:9000/veil"), "http://h:9000/veil/peer");
        assert_eq!(endpoint("http://h:9000/veil/"), "http://h:9000/veil/peer");
        assert_eq!(endpoint("http://h:9000/a/b?x=1"), "http://h:9000/a/b/peer");
    }
}
