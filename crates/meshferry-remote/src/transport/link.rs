//! TCP command link to one editor node.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use super::multicast::TransportShared;
use crate::channel::{CommandLink, CommandRequest};
use crate::error::RemoteError;
use crate::message::{CommandResultData, JsonMessageCodec, MessageKind, RemoteMessage};

/// Commands and results travel over TCP; `close_connection` goes out over
/// the multicast socket, as the editor expects.
pub struct TcpCommandLink {
    framed: Framed<TcpStream, JsonMessageCodec>,
    shared: Arc<TransportShared>,
    node_id: String,
}

impl TcpCommandLink {
    pub(crate) fn new(stream: TcpStream, shared: Arc<TransportShared>, node_id: String) -> Self {
        Self {
            framed: Framed::new(stream, JsonMessageCodec::new()),
            shared,
            node_id,
        }
    }
}

#[async_trait]
impl CommandLink for TcpCommandLink {
    async fn transmit(&mut self, request: &CommandRequest) -> Result<(), RemoteError> {
        let message = RemoteMessage::command(&self.shared.node_id, &self.node_id, &request.to_data())?;
        self.framed.send(message).await
    }

    async fn receive(&mut self) -> Result<Option<CommandResultData>, RemoteError> {
        while let Some(frame) = self.framed.next().await {
            let message = frame?;
            if !message.is_for(&self.shared.node_id) {
                continue;
            }
            if message.kind != MessageKind::CommandResult {
                debug!(kind = ?message.kind, "Ignoring unexpected message on command link");
                continue;
            }
            return message.decode_data().map(Some);
        }
        Ok(None)
    }

    async fn shutdown(&mut self) -> Result<(), RemoteError> {
        let close = RemoteMessage::close_connection(&self.shared.node_id, &self.node_id);
        let notified = self.shared.broadcast(&close).await;
        let closed = SinkExt::<RemoteMessage>::close(&mut self.framed).await;
        debug!(node_id = %self.node_id, "Command link closed");
        notified.and(closed)
    }
}
