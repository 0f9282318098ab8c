//! Node-to-node protocol and the [`Peer`] that drives it

pub mod client;
mod handler;
mod messages;
mod peer;
mod transport;

pub use messages::{
    ErrorReply, Fetch, FetchReply, Message, PartyInfo, PartyInfoReply, Push, PushReply, Reply,
};
pub use peer::{Peer, PeerBuilder, PeerError, DEFAULT_REQUEST_TIMEOUT};
pub use transport::{Transport, TransportError};
