use serde::{Deserialize, Serialize};
use url::Url;

use crate::directory::DirectoryEntry;

/// Directory exchange: the sender's full view of the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyInfo {
    /// Address the sender is reachable at
    pub sender: Url,
    pub entries: Vec<DirectoryEntry>,
}

/// The responder's full view of the directory after merging the request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyInfoReply {
    pub entries: Vec<DirectoryEntry>,
}
