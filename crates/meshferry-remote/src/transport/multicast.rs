//! Multicast discovery and connect-back command sessions.
//!
//! The transport joins the editor's multicast group, pings on an interval and
//! records pongs in a [`NodeTracker`]. To open a command session it listens
//! on the command endpoint, multicasts `open_connection` to the chosen node
//! and accepts the editor's TCP connection.

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use meshferry_core::config::RemoteConfig;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpSocket, UdpSocket};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::link::TcpCommandLink;
use crate::channel::{CommandLink, Connector};
use crate::discovery::{AnnouncementSource, DiscoveredNode, NodeTracker};
use crate::error::RemoteError;
use crate::message::{MessageKind, OpenConnectionData, PongData, RemoteMessage};

/// Largest datagram accepted.
const MAX_DATAGRAM_BYTES: usize = 65_536;

/// Shared state between the transport, its background task and open links.
#[derive(Debug)]
pub(crate) struct TransportShared {
    pub(crate) node_id: String,
    pub(crate) config: RemoteConfig,
    pub(crate) socket: UdpSocket,
    pub(crate) tracker: NodeTracker,
}

impl TransportShared {
    /// Send a message to the multicast group.
    pub(crate) async fn broadcast(&self, message: &RemoteMessage) -> Result<(), RemoteError> {
        let bytes = serde_json::to_vec(message)?;
        self.socket
            .send_to(&bytes, self.config.group_endpoint())
            .await?;
        Ok(())
    }

    /// Process one datagram.
    pub(crate) fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) {
        let message: RemoteMessage = match serde_json::from_slice(bytes) {
            Ok(message) => message,
            Err(e) => {
                debug!(from = %from, error = %e, "Ignoring malformed datagram");
                return;
            }
        };
        if !message.is_for(&self.node_id) {
            return;
        }
        if message.kind != MessageKind::Pong {
            return;
        }
        let pong: PongData = message.decode_data().unwrap_or_default();
        self.tracker
            .record(DiscoveredNode::from_pong(&message.source, from, pong, Utc::now()));
    }
}

/// Multicast discovery plus TCP command sessions.
pub struct MulticastTransport {
    shared: Arc<TransportShared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MulticastTransport {
    /// Join the multicast group and start pinging.
    pub async fn start(config: RemoteConfig) -> Result<Self, RemoteError> {
        let socket = bind_multicast(&config)?;
        info!(
            group = %config.group_endpoint(),
            bind = %config.multicast_bind,
            "Joined remote-execution multicast group"
        );
        Ok(Self::with_socket(config, socket))
    }

    /// Start over an already bound socket.
    pub(crate) fn with_socket(config: RemoteConfig, socket: UdpSocket) -> Self {
        let shared = Arc::new(TransportShared {
            node_id: Uuid::new_v4().to_string(),
            tracker: NodeTracker::new(config.node_timeout()),
            config,
            socket,
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_announcements(shared.clone(), cancel.clone()));
        Self {
            shared,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// This client's node ID.
    pub fn node_id(&self) -> &str {
        &self.shared.node_id
    }

    /// The live node registry.
    pub fn tracker(&self) -> &NodeTracker {
        &self.shared.tracker
    }

    /// Stop the background task.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Multicast task ended abnormally");
            }
        }
    }
}

impl Drop for MulticastTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl AnnouncementSource for MulticastTransport {
    async fn snapshot(&self) -> Result<Vec<DiscoveredNode>, RemoteError> {
        self.shared.tracker.expire(Utc::now());
        Ok(self.shared.tracker.snapshot())
    }
}

#[async_trait]
impl Connector for MulticastTransport {
    async fn open(&self, node: &DiscoveredNode) -> Result<Box<dyn CommandLink>, RemoteError> {
        let config = &self.shared.config;
        let listener = {
            let socket = TcpSocket::new_v4()?;
            socket.set_reuseaddr(true)?;
            socket.bind(config.command_endpoint())?;
            socket.listen(1)?
        };
        let local = listener.local_addr()?;

        let request = RemoteMessage::open_connection(
            &self.shared.node_id,
            &node.node_id,
            &OpenConnectionData {
                command_ip: local.ip().to_string(),
                command_port: local.port(),
            },
        )?;
        self.shared.broadcast(&request).await?;
        debug!(node_id = %node.node_id, endpoint = %local, "Requested command connection");

        let timeout = config.connect_timeout();
        let (stream, peer) = tokio::time::timeout(timeout, listener.accept())
            .await
            .map_err(|_| RemoteError::ConnectTimeout {
                node_id: node.node_id.clone(),
                timeout,
            })??;

        info!(node_id = %node.node_id, peer = %peer, "Command connection established");
        Ok(Box::new(TcpCommandLink::new(
            stream,
            self.shared.clone(),
            node.node_id.clone(),
        )))
    }
}

/// Ping on an interval and record pongs until cancelled.
async fn run_announcements(shared: Arc<TransportShared>, cancel: CancellationToken) {
    let mut ping = tokio::time::interval(shared.config.ping_interval());
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ping.tick() => {
                shared.tracker.expire(Utc::now());
                if let Err(e) = shared.broadcast(&RemoteMessage::ping(&shared.node_id)).await {
                    warn!(error = %e, "Failed to send ping");
                }
            }
            received = shared.socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => shared.handle_datagram(&buf[..len], from),
                Err(e) => warn!(error = %e, "Multicast receive failed"),
            }
        }
    }

    debug!("Multicast announcement loop stopped");
}

/// Bind a reusable UDP socket and join the group.
fn bind_multicast(config: &RemoteConfig) -> Result<UdpSocket, RemoteError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;

    let bind = SocketAddrV4::new(config.multicast_bind, config.multicast_port);
    socket.bind(&SocketAddr::V4(bind).into())?;

    socket.join_multicast_v4(&config.multicast_group, &config.multicast_bind)?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_multicast_ttl_v4(config.multicast_ttl)?;

    Ok(UdpSocket::from_std(socket.into())?)
}
