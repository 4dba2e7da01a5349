//! Editor node discovery.
//!
//! [`NodeDiscovery::discover`] polls an [`AnnouncementSource`] until a node
//! is known or the timeout elapses. An empty result is not an error here;
//! callers decide what "no editor" means.

pub mod node;
pub mod tracker;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use node::DiscoveredNode;
pub use tracker::NodeTracker;

use crate::error::RemoteError;

/// Something that knows which editor nodes are currently live.
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Currently known nodes, in discovery order.
    async fn snapshot(&self) -> Result<Vec<DiscoveredNode>, RemoteError>;
}

/// Polls an announcement source for live nodes.
pub struct NodeDiscovery {
    source: Arc<dyn AnnouncementSource>,
    poll_interval: Duration,
}

impl NodeDiscovery {
    /// Create a poller over `source`.
    pub fn new(source: Arc<dyn AnnouncementSource>, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
        }
    }

    /// Wait up to `timeout` for at least one node.
    ///
    /// Sleeps at least one poll interval before giving up and returns within
    /// `[timeout, timeout + poll_interval]` when nothing answers.
    pub async fn discover(&self, timeout: Duration) -> Vec<DiscoveredNode> {
        let start = Instant::now();
        let mut polled_after_sleep = false;

        loop {
            match self.source.snapshot().await {
                Ok(nodes) if !nodes.is_empty() => {
                    debug!(
                        count = nodes.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Editor nodes available"
                    );
                    return nodes;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Node poll failed"),
            }

            if polled_after_sleep && start.elapsed() >= timeout {
                debug!(timeout_ms = timeout.as_millis() as u64, "No editor nodes discovered");
                return Vec::new();
            }

            tokio::time::sleep(self.poll_interval).await;
            polled_after_sleep = true;
        }
    }
}
