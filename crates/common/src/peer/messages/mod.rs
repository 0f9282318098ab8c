use serde::{Deserialize, Serialize};

mod fetch;
mod party_info;
mod push;

pub use fetch::{Fetch, FetchReply};
pub use party_info::{PartyInfo, PartyInfoReply};
pub use push::{Push, PushReply};

/// Top-level request enum for node-to-node traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Directory exchange, answered with the responder's entries
    PartyInfo(PartyInfo),
    /// Request a stored record by digest
    Fetch(Fetch),
    /// Deliver a record to a recipient node
    Push(Push),
}

/// Top-level response enum for node-to-node traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reply {
    PartyInfo(PartyInfoReply),
    Fetch(FetchReply),
    Push(PushReply),
    /// The request could not be served
    Error(ErrorReply),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub message: String,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::PartyInfo(_) => "party_info",
            Message::Fetch(_) => "fetch",
            Message::Push(_) => "push",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

impl Reply {
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(ErrorReply {
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reply::PartyInfo(_) => "party_info",
            Reply::Fetch(_) => "fetch",
            Reply::Push(_) => "push",
            Reply::Error(_) => "error",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
