//! Discovered editor nodes.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::PongData;

/// A live editor instance that answered a ping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredNode {
    /// Protocol node ID.
    pub node_id: String,
    /// Address the pong came from.
    pub address: SocketAddr,
    /// Last time a pong was received.
    pub last_seen: DateTime<Utc>,
    /// Project name.
    pub project_name: Option<String>,
    /// Engine version.
    pub engine_version: Option<String>,
    /// Host name.
    pub machine: Option<String>,
    /// OS user.
    pub user: Option<String>,
}

impl DiscoveredNode {
    /// Build a node from a pong.
    pub fn from_pong(node_id: &str, address: SocketAddr, pong: PongData, seen: DateTime<Utc>) -> Self {
        Self {
            node_id: node_id.to_string(),
            address,
            last_seen: seen,
            project_name: pong.project_name,
            engine_version: pong.engine_version,
            machine: pong.machine,
            user: pong.user,
        }
    }

    /// Short human-readable label.
    pub fn label(&self) -> String {
        match (&self.project_name, &self.machine) {
            (Some(project), Some(machine)) => format!("{project} on {machine}"),
            (Some(project), None) => project.clone(),
            _ => self.node_id.clone(),
        }
    }
}
