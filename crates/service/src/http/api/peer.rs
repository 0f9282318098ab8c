use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::transport::OCTET_STREAM;
use crate::ServiceState;

/// Node-to-node endpoint; bodies are bincode encoded messages and replies
pub async fn handler(
    State(state): State<ServiceState>,
    body: Bytes,
) -> Result<impl IntoResponse, PeerEndpointError> {
    let reply = state.peer().handle_bytes(&body).await?;
    Ok((http::StatusCode::OK, [(CONTENT_TYPE, OCTET_STREAM)], reply).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum PeerEndpointError {
    #[error("failed to encode reply: {0}")]
    Encode(#[from] bincode::Error),
}

impl IntoResponse for PeerEndpointError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "failed to encode reply",
        )
            .into_response()
    }
}
