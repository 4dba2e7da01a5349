//! A held-open command session.

use std::time::Duration;

use tracing::{debug, warn};

use super::{CommandLink, CommandRequest, CommandResponse};
use crate::discovery::DiscoveredNode;
use crate::error::RemoteError;

/// An exclusive session with one node.
///
/// Closing is guaranteed: [`CommandSession::close`] shuts the link down, and
/// dropping an unclosed session does so best-effort on the runtime.
pub struct CommandSession {
    node: DiscoveredNode,
    link: Option<Box<dyn CommandLink>>,
    command_timeout: Duration,
    lost: bool,
}

impl CommandSession {
    pub(crate) fn new(node: DiscoveredNode, link: Box<dyn CommandLink>, command_timeout: Duration) -> Self {
        Self {
            node,
            link: Some(link),
            command_timeout,
            lost: false,
        }
    }

    /// The node this session talks to.
    pub fn node(&self) -> &DiscoveredNode {
        &self.node
    }

    /// Whether the connection was lost while awaiting a result.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Transmit one command and wait for its result.
    pub async fn execute(&mut self, request: &CommandRequest) -> Result<CommandResponse, RemoteError> {
        if self.lost {
            return Err(RemoteError::transmitting("connection was lost earlier in this session"));
        }
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| RemoteError::transmitting("session is closed"))?;

        link.transmit(request)
            .await
            .map_err(RemoteError::transmitting)?;

        match tokio::time::timeout(self.command_timeout, link.receive()).await {
            Err(_) => Err(RemoteError::CommandTimeout {
                timeout: self.command_timeout,
            }),
            Ok(Ok(Some(data))) => {
                debug!(node_id = %self.node.node_id, success = data.success, "Command result received");
                Ok(CommandResponse::from_result(data))
            }
            Ok(Ok(None)) => {
                warn!(node_id = %self.node.node_id, "Command link closed before a result arrived");
                self.lost = true;
                Ok(CommandResponse::tentative("link closed"))
            }
            Ok(Err(e)) => {
                warn!(node_id = %self.node.node_id, error = %e, "Command link failed before a result arrived");
                self.lost = true;
                Ok(CommandResponse::tentative(e))
            }
        }
    }

    /// Close the session.
    pub async fn close(mut self) -> Result<(), RemoteError> {
        match self.link.take() {
            Some(mut link) => link.shutdown().await,
            None => Ok(()),
        }
    }
}

impl Drop for CommandSession {
    fn drop(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        let node_id = self.node.node_id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = link.shutdown().await {
                        debug!(node_id = %node_id, error = %e, "Best-effort session close failed");
                    }
                });
            }
            Err(_) => warn!(node_id = %node_id, "Command session dropped outside a runtime, not closed"),
        }
    }
}
