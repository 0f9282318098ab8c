use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use common::directory::{DirectoryEntry, PeerStatus};

use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfoEntry {
    /// Hex encoded public key
    pub public_key: String,
    pub address: Url,
    pub last_seen: DateTime<Utc>,
}

impl From<DirectoryEntry> for PartyInfoEntry {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            public_key: entry.public_key.to_hex(),
            address: entry.address,
            last_seen: entry.last_seen,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfoResponse {
    pub url: Url,
    pub keys: Vec<PartyInfoEntry>,
    pub peers: Vec<PeerStatus>,
}

pub async fn handler(State(state): State<ServiceState>) -> Response {
    let directory = state.peer().directory();
    let response = PartyInfoResponse {
        url: directory.self_address().clone(),
        keys: directory.entries().into_iter().map(Into::into).collect(),
        peers: directory.peers(),
    };
    (http::StatusCode::OK, Json(response)).into_response()
}
