//! `meshferry nodes`: list running editors.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use meshferry_core::config::AppConfig;
use meshferry_core::error::AppError;
use meshferry_remote::{DiscoveredNode, MulticastTransport, NodeDiscovery};

use crate::output::{self, OutputFormat};

/// Arguments for the nodes command
#[derive(Debug, Args)]
pub struct NodesArgs {
    /// Seconds to listen for editors
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    node_id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Engine")]
    engine: String,
    #[tabled(rename = "Machine")]
    machine: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

impl From<DiscoveredNode> for NodeRow {
    fn from(node: DiscoveredNode) -> Self {
        let dash = || "-".to_string();
        Self {
            node_id: node.node_id,
            address: node.address.to_string(),
            project: node.project_name.unwrap_or_else(dash),
            engine: node.engine_version.unwrap_or_else(dash),
            machine: node.machine.unwrap_or_else(dash),
            last_seen: node.last_seen.to_rfc3339(),
        }
    }
}

/// Execute the nodes command
pub async fn execute(args: &NodesArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.remote.discovery_timeout());

    let transport = Arc::new(MulticastTransport::start(config.remote.clone()).await?);
    let discovery = NodeDiscovery::new(transport.clone(), config.remote.poll_interval());
    let nodes = discovery.discover(timeout).await;
    transport.shutdown().await;

    let rows: Vec<NodeRow> = nodes.into_iter().map(NodeRow::from).collect();
    output::print_list(
        &rows,
        format,
        &format!("No running editors found within {}s", timeout.as_secs()),
    );
    Ok(())
}
