use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use serde::{Deserialize, Serialize};

use common::crypto::PublicKey;
use common::peer::PeerError;
use common::record::Digest;

use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveRequest {
    /// Hex encoded record digest
    pub key: String,
    /// Hex encoded local recipient key, the node's first key if absent
    #[serde(default)]
    pub to: Option<String>,
    /// Hex encoded sender key, used to find the record when not held locally
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponse {
    /// Base64 encoded payload
    pub payload: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ReceiveRequest>,
) -> Result<impl IntoResponse, ReceiveError> {
    let digest = Digest::from_hex(&req.key).map_err(|e| ReceiveError::InvalidKey(e.to_string()))?;
    let to = req.to.as_deref().map(parse_key).transpose()?;
    let from = req.from.as_deref().map(parse_key).transpose()?;

    tracing::debug!(%digest, "opening record");
    let payload = state
        .peer()
        .receive(&digest, to.as_ref(), from.as_ref())
        .await?;

    Ok((
        http::StatusCode::OK,
        Json(ReceiveResponse {
            payload: base64::engine::general_purpose::STANDARD.encode(payload),
        }),
    )
        .into_response())
}

fn parse_key(hex: &str) -> Result<PublicKey, ReceiveError> {
    PublicKey::from_hex(hex).map_err(|e| ReceiveError::InvalidPublicKey(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("Invalid record key: {0}")]
    InvalidKey(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

impl IntoResponse for ReceiveError {
    fn into_response(self) -> Response {
        match self {
            ReceiveError::InvalidKey(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Invalid record key: {}", msg),
            )
                .into_response(),
            ReceiveError::InvalidPublicKey(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Invalid public key: {}", msg),
            )
                .into_response(),
            ReceiveError::Peer(e) => super::peer_error_response(e),
        }
    }
}
