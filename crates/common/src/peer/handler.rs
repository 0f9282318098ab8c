use super::messages::{FetchReply, Message, PartyInfoReply, PushReply, Reply};
use super::peer::Peer;

impl Peer {
    /// Answer a message from another node
    pub async fn handle(&self, message: Message) -> Reply {
        tracing::debug!(kind = message.kind(), "handling peer message");
        match message {
            Message::PartyInfo(info) => Reply::PartyInfo(PartyInfoReply {
                entries: self.directory().exchange(info.sender, info.entries),
            }),
            Message::Fetch(fetch) => match self.store().get(&fetch.digest).await {
                Ok(record) => Reply::Fetch(FetchReply { record }),
                Err(e) => {
                    tracing::error!(digest = %fetch.digest, "failed to read record: {}", e);
                    Reply::error("failed to read record")
                }
            },
            Message::Push(push) if !push.record.recipients().any(|r| self.keys().is_local(r)) => {
                tracing::warn!(
                    digest = %push.record.digest(),
                    "refusing pushed record with no local recipient"
                );
                Reply::error("no local recipient")
            }
            Message::Push(push) => match self.store().put(&push.record).await {
                Ok(digest) => {
                    tracing::debug!(%digest, "accepted pushed record");
                    Reply::Push(PushReply { digest })
                }
                Err(e) => {
                    tracing::error!("failed to store pushed record: {}", e);
                    Reply::error(e.to_string())
                }
            },
        }
    }

    /// Decode a request, answer it and encode the reply
    ///
    /// Malformed requests get an `Error` reply rather than a failure, so the
    /// caller always has something to send back.
    pub async fn handle_bytes(&self, request: &[u8]) -> Result<Vec<u8>, bincode::Error> {
        let reply = match Message::decode(request) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                tracing::warn!("failed to decode peer message: {}", e);
                Reply::error(format!("malformed message: {}", e))
            }
        };
        reply.encode()
    }
}
