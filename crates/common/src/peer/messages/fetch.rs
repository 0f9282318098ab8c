use serde::{Deserialize, Serialize};

use crate::record::{Digest, EncryptedRecord};

/// Ask a peer for the record stored under a digest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fetch {
    pub digest: Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReply {
    /// `None` when the peer does not hold the record
    pub record: Option<EncryptedRecord>,
}
