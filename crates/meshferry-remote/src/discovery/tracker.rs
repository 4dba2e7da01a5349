//! Node registry with liveness expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use super::node::DiscoveredNode;

#[derive(Debug, Clone)]
struct TrackedNode {
    node: DiscoveredNode,
    first_seen: DateTime<Utc>,
}

/// Tracks nodes that answered pings, forgetting those that go quiet.
#[derive(Debug)]
pub struct NodeTracker {
    nodes: DashMap<String, TrackedNode>,
    timeout: Duration,
}

impl NodeTracker {
    /// Create a tracker that expires nodes not heard from within `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            nodes: DashMap::new(),
            timeout,
        }
    }

    /// Record a pong. Keeps the original discovery order.
    pub fn record(&self, node: DiscoveredNode) {
        match self.nodes.get_mut(&node.node_id) {
            Some(mut entry) => entry.node = node,
            None => {
                info!(node_id = %node.node_id, address = %node.address, "Discovered editor node");
                let first_seen = node.last_seen;
                self.nodes
                    .insert(node.node_id.clone(), TrackedNode { node, first_seen });
            }
        }
    }

    /// Drop nodes whose last pong is older than the timeout.
    pub fn expire(&self, now: DateTime<Utc>) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node_id, tracked| {
            let alive = (now - tracked.node.last_seen)
                .to_std()
                .map(|age| age <= self.timeout)
                .unwrap_or(true);
            if !alive {
                debug!(node_id = %node_id, "Editor node timed out");
            }
            alive
        });
        before - self.nodes.len()
    }

    /// Known nodes in discovery order.
    pub fn snapshot(&self) -> Vec<DiscoveredNode> {
        let mut tracked: Vec<TrackedNode> = self.nodes.iter().map(|r| r.value().clone()).collect();
        tracked.sort_by(|a, b| {
            a.first_seen
                .cmp(&b.first_seen)
                .then_with(|| a.node.node_id.cmp(&b.node.node_id))
        });
        tracked.into_iter().map(|t| t.node).collect()
    }

    /// Look up a node by ID.
    pub fn get(&self, node_id: &str) -> Option<DiscoveredNode> {
        self.nodes.get(node_id).map(|r| r.value().node.clone())
    }

    /// Number of known nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are known.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
