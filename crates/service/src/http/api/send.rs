use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use serde::{Deserialize, Serialize};

use common::crypto::PublicKey;
use common::peer::PeerError;

use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Base64 encoded payload to seal
    pub payload: String,
    /// Hex encoded local sender key, the node's first key if absent
    #[serde(default)]
    pub from: Option<String>,
    /// Hex encoded recipient keys
    pub to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    /// Hex encoded digest of the stored record
    pub key: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<SendRequest>,
) -> Result<impl IntoResponse, SendError> {
    let payload = base64::engine::general_purpose::STANDARD
        .decode(&req.payload)
        .map_err(|e| SendError::InvalidPayload(e.to_string()))?;
    let from = req.from.as_deref().map(parse_key).transpose()?;
    let to = req
        .to
        .iter()
        .map(|key| parse_key(key))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(recipients = to.len(), size = payload.len(), "sealing payload");
    let digest = state.peer().send(&payload, from.as_ref(), &to).await?;

    Ok((
        http::StatusCode::OK,
        Json(SendResponse {
            key: digest.to_hex(),
        }),
    )
        .into_response())
}

fn parse_key(hex: &str) -> Result<PublicKey, SendError> {
    PublicKey::from_hex(hex).map_err(|e| SendError::InvalidPublicKey(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

impl IntoResponse for SendError {
    fn into_response(self) -> Response {
        match self {
            SendError::InvalidPayload(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Invalid payload: {}", msg),
            )
                .into_response(),
            SendError::InvalidPublicKey(msg) => (
                http::StatusCode::BAD_REQUEST,
                format!("Invalid public key: {}", msg),
            )
                .into_response(),
            SendError::Peer(e) => super::peer_error_response(e),
        }
    }
}
