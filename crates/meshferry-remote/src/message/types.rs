//! Protocol message definitions.
//!
//! Every message is a JSON object `{version, magic, type, source, dest?,
//! data?}`. `data` is typed per message kind and decoded on demand.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Protocol version spoken by this client.
pub const PROTOCOL_VERSION: u32 = 1;

/// Magic string identifying protocol messages.
pub const PROTOCOL_MAGIC: &str = "ue_py";

/// Message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Discovery request (multicast).
    Ping,
    /// Discovery reply carrying node metadata (multicast).
    Pong,
    /// Ask a node to connect back to our command endpoint (multicast).
    OpenConnection,
    /// End a command session (multicast).
    CloseConnection,
    /// Execute a command (TCP).
    Command,
    /// Result of a command (TCP).
    CommandResult,
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Protocol version.
    pub version: u32,
    /// Protocol magic.
    pub magic: String,
    /// Message type.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Sender node ID.
    pub source: String,
    /// Recipient node ID, absent for broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// Kind-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RemoteMessage {
    /// Create a message without payload.
    pub fn new(kind: MessageKind, source: impl Into<String>, dest: Option<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            magic: PROTOCOL_MAGIC.to_string(),
            kind,
            source: source.into(),
            dest,
            data: None,
        }
    }

    /// Attach a typed payload.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self, RemoteError> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Broadcast ping.
    pub fn ping(source: &str) -> Self {
        Self::new(MessageKind::Ping, source, None)
    }

    /// Ask `dest` to open a command connection to `command_ip:command_port`.
    pub fn open_connection(source: &str, dest: &str, data: &OpenConnectionData) -> Result<Self, RemoteError> {
        Self::new(MessageKind::OpenConnection, source, Some(dest.to_string())).with_data(data)
    }

    /// Tell `dest` the command session is over.
    pub fn close_connection(source: &str, dest: &str) -> Self {
        Self::new(MessageKind::CloseConnection, source, Some(dest.to_string()))
    }

    /// Command for `dest`.
    pub fn command(source: &str, dest: &str, data: &CommandData) -> Result<Self, RemoteError> {
        Self::new(MessageKind::Command, source, Some(dest.to_string())).with_data(data)
    }

    /// Decode the payload.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, RemoteError> {
        let value = self
            .data
            .clone()
            .ok_or_else(|| RemoteError::Protocol(format!("{:?} message without data", self.kind)))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whether the version and magic match this client.
    pub fn is_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION && self.magic == PROTOCOL_MAGIC
    }

    /// Whether a node with ID `node_id` should process this message: it must
    /// be compatible, not sent by `node_id` itself, and either broadcast or
    /// addressed to `node_id`.
    pub fn is_for(&self, node_id: &str) -> bool {
        self.is_compatible()
            && self.source != node_id
            && self.dest.as_deref().is_none_or(|dest| dest == node_id)
    }
}

/// Node metadata carried by a pong. All fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PongData {
    /// OS user running the editor.
    pub user: Option<String>,
    /// Host name.
    pub machine: Option<String>,
    /// Engine version string.
    pub engine_version: Option<String>,
    /// Engine installation root.
    pub engine_root: Option<String>,
    /// Project directory.
    pub project_root: Option<String>,
    /// Project name.
    pub project_name: Option<String>,
}

/// Payload of `open_connection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenConnectionData {
    /// Address the editor should connect to.
    pub command_ip: String,
    /// Port the editor should connect to.
    pub command_port: u16,
}

/// Payload of `command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    /// Script text or file path, depending on `exec_mode`.
    pub command: String,
    /// Suppress modal dialogs in the editor.
    pub unattended: bool,
    /// Execution mode (`ExecuteFile`, `ExecuteStatement`, `EvaluateStatement`).
    pub exec_mode: String,
}

/// One line of command output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Log category (`Info`, `Warning`, `Error`).
    #[serde(rename = "type")]
    pub kind: String,
    /// The text.
    pub output: String,
}

/// Payload of `command_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResultData {
    /// Whether the command ran without raising.
    pub success: bool,
    /// Echo of the command.
    #[serde(default)]
    pub command: String,
    /// Evaluation result or exception text.
    #[serde(default)]
    pub result: String,
    /// Captured output.
    #[serde(default)]
    pub output: Vec<OutputEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_wire_format() {
        let json = serde_json::to_value(RemoteMessage::ping("me")).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"version": 1, "magic": "ue_py", "type": "ping", "source": "me"})
        );
    }

    #[test]
    fn test_parse_editor_pong() {
        let raw = r#"{"version": 1, "magic": "ue_py", "type": "pong", "source": "node-a", "dest": "me",
            "data": {"user": "artist", "machine": "WS01", "engine_version": "5.4.1",
                     "engine_root": "C:/UE_5.4", "project_root": "D:/Proj", "project_name": "Proj"}}"#;
        let msg: RemoteMessage = serde_json::from_str(raw).expect("parse");
        assert_eq!(msg.kind, MessageKind::Pong);
        assert!(msg.is_for("me"));
        let pong: PongData = msg.decode_data().expect("pong data");
        assert_eq!(pong.project_name.as_deref(), Some("Proj"));
        assert_eq!(pong.machine.as_deref(), Some("WS01"));
    }

    #[test]
    fn test_filtering() {
        let own = RemoteMessage::ping("me");
        assert!(!own.is_for("me"));

        let other_dest = RemoteMessage::close_connection("node-a", "someone-else");
        assert!(!other_dest.is_for("me"));

        let broadcast = RemoteMessage::ping("node-a");
        assert!(broadcast.is_for("me"));

        let mut wrong_magic = RemoteMessage::ping("node-a");
        wrong_magic.magic = "other".into();
        assert!(!wrong_magic.is_for("me"));
    }

    #[test]
    fn test_command_result_defaults() {
        let msg: RemoteMessage = serde_json::from_value(serde_json::json!({
            "version": 1, "magic": "ue_py", "type": "command_result", "source": "node-a",
            "dest": "me", "data": {"success": false}
        }))
        .expect("parse");
        let data: CommandResultData = msg.decode_data().expect("data");
        assert!(!data.success);
        assert!(data.output.is_empty());
    }

    #[test]
    fn test_missing_data_is_protocol_error() {
        let msg = RemoteMessage::ping("node-a");
        assert!(matches!(
            msg.decode_data::<PongData>(),
            Err(RemoteError::Protocol(_))
        ));
    }
}
