//! Exclusive command sessions with a live editor node.
//!
//! Failure policy:
//! - failure while opening a session or transmitting a command is a hard
//!   [`RemoteError::Channel`];
//! - losing the connection while awaiting a result yields a tentative
//!   success carrying a warning, since the editor may have run the command;
//! - no result within the command timeout is [`RemoteError::CommandTimeout`].

pub mod session;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use session::CommandSession;

use crate::discovery::DiscoveredNode;
use crate::error::RemoteError;
use crate::message::{CommandData, CommandResultData, OutputEntry};

/// Warning attached to a tentative success.
pub const CONNECTION_LOST_WARNING: &str =
    "Connection to the editor was lost after the command was sent; it probably succeeded, verify manually";

/// How the editor should interpret the command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecMode {
    /// Execute the text as a script file body.
    ExecuteFile,
    /// Execute a single statement.
    ExecuteStatement,
    /// Evaluate an expression and return its value.
    EvaluateStatement,
}

impl ExecMode {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecuteFile => "ExecuteFile",
            Self::ExecuteStatement => "ExecuteStatement",
            Self::EvaluateStatement => "EvaluateStatement",
        }
    }
}

/// One self-contained command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    /// Script body.
    pub command: String,
    /// Execution mode.
    pub exec_mode: ExecMode,
    /// Suppress modal dialogs.
    pub unattended: bool,
}

impl CommandRequest {
    /// Unattended script execution, the mode used for imports.
    pub fn script(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exec_mode: ExecMode::ExecuteFile,
            unattended: true,
        }
    }

    /// Wire payload.
    pub fn to_data(&self) -> CommandData {
        CommandData {
            command: self.command.clone(),
            unattended: self.unattended,
            exec_mode: self.exec_mode.as_str().to_string(),
        }
    }
}

/// Result of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the command succeeded (tentatively, when `warning` is set).
    pub success: bool,
    /// Captured output lines.
    pub output: Vec<OutputEntry>,
    /// Evaluation result or exception text.
    pub result: String,
    /// Set only when the result could not be confirmed.
    pub warning: Option<String>,
}

impl CommandResponse {
    /// Response from a received result.
    pub fn from_result(data: CommandResultData) -> Self {
        Self {
            success: data.success,
            output: data.output,
            result: data.result,
            warning: None,
        }
    }

    /// Tentative success after losing the connection.
    pub fn tentative(reason: impl std::fmt::Display) -> Self {
        Self {
            success: true,
            output: Vec::new(),
            result: String::new(),
            warning: Some(format!("{CONNECTION_LOST_WARNING} ({reason})")),
        }
    }

    /// Whether this is an unconfirmed success.
    pub fn is_tentative(&self) -> bool {
        self.warning.is_some()
    }

    /// Output text, one entry per line.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .map(|entry| entry.output.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Opens command links to nodes.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open an exclusive link to `node`.
    async fn open(&self, node: &DiscoveredNode) -> Result<Box<dyn CommandLink>, RemoteError>;
}

/// A connected command link.
#[async_trait]
pub trait CommandLink: Send {
    /// Send one command.
    async fn transmit(&mut self, request: &CommandRequest) -> Result<(), RemoteError>;

    /// Wait for the next command result. `Ok(None)` means the link closed.
    async fn receive(&mut self) -> Result<Option<CommandResultData>, RemoteError>;

    /// Tell the node the session is over and close the link.
    async fn shutdown(&mut self) -> Result<(), RemoteError>;
}

/// Opens sessions and runs one-shot commands.
#[derive(Clone)]
pub struct CommandChannel {
    connector: Arc<dyn Connector>,
    command_timeout: Duration,
}

impl CommandChannel {
    /// Create a channel over `connector`.
    pub fn new(connector: Arc<dyn Connector>, command_timeout: Duration) -> Self {
        Self {
            connector,
            command_timeout,
        }
    }

    /// Open a session that stays exclusive until closed or dropped.
    pub async fn open(&self, node: &DiscoveredNode) -> Result<CommandSession, RemoteError> {
        let link = self
            .connector
            .open(node)
            .await
            .map_err(RemoteError::opening)?;
        Ok(CommandSession::new(node.clone(), link, self.command_timeout))
    }

    /// Open a session, run one command and close the session.
    pub async fn send(&self, node: &DiscoveredNode, request: &CommandRequest) -> Result<CommandResponse, RemoteError> {
        let mut session = self.open(node).await?;
        let result = session.execute(request).await;
        if let Err(e) = session.close().await {
            warn!(node_id = %node.node_id, error = %e, "Failed to close command session");
        }
        result
    }

    /// Command result timeout.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }
}
