use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use common::directory::DirectoryError;
use common::enclave::EnclaveError;
use common::peer::PeerError;
use common::store::ContentStoreError;

use crate::ServiceState;

pub mod party_info;
pub mod peer;
pub mod receive;
pub mod send;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/send", post(send::handler))
        .route("/receive", post(receive::handler))
        .route("/partyinfo", get(party_info::handler))
        .route("/peer", post(peer::handler))
        .with_state(state)
}

/// Opaque message for every failure to open a record
pub const CANNOT_DECRYPT: &str = "cannot decrypt";

/// Map a peer failure onto the status and message a client gets
///
/// Every cryptographic failure collapses to [`CANNOT_DECRYPT`] so a caller
///  cannot tell a missing seal from a bad tag.
pub(crate) fn peer_error_response(err: PeerError) -> Response {
    if err.is_cannot_decrypt() {
        tracing::warn!("decryption refused: {}", err);
        return (StatusCode::BAD_REQUEST, CANNOT_DECRYPT).into_response();
    }

    match err {
        PeerError::Enclave(EnclaveError::NoRecipients) => {
            (StatusCode::BAD_REQUEST, "no recipients given").into_response()
        }
        PeerError::Enclave(EnclaveError::UnknownSender(key)) => (
            StatusCode::BAD_REQUEST,
            format!("sender key {} is not held by this node", key),
        )
            .into_response(),
        PeerError::Enclave(EnclaveError::RecordNotFound(digest))
        | PeerError::RecordNotFound(digest) => (
            StatusCode::NOT_FOUND,
            format!("record {} not found", digest),
        )
            .into_response(),
        PeerError::Directory(DirectoryError::NotFound(key)) => (
            StatusCode::NOT_FOUND,
            format!("no node known for key {}", key),
        )
            .into_response(),
        PeerError::Store(e @ ContentStoreError::Conflict(_))
        | PeerError::Enclave(EnclaveError::Store(e @ ContentStoreError::Conflict(_))) => {
            tracing::error!("integrity violation: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "integrity violation").into_response()
        }
        e => {
            tracing::error!("request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}
