use serde::{Deserialize, Serialize};

use crate::record::{Digest, EncryptedRecord};

/// Hand a freshly sealed record to a recipient's node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Push {
    pub record: EncryptedRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushReply {
    /// Digest the receiving node stored the record under
    pub digest: Digest,
}
