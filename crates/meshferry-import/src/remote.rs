//! Workspace operations executed in the editor over a command session.
//!
//! Each operation is a typed [`WorkspaceOp`]. It is serialized to JSON and
//! embedded as a string literal into a fixed dispatcher script, so paths
//! never pass through hand-built script text.

use async_trait::async_trait;
use meshferry_core::types::ContentPath;
use meshferry_remote::{CommandChannel, CommandRequest, CommandResponse, CommandSession, DiscoveredNode, RemoteError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::command::ImportCommand;
use crate::error::WorkspaceError;
use crate::workspace::{AssetInfo, CollisionMode, Workspace, WorkspaceConnector, WorkspaceSession};

const DISPATCHER: &str = include_str!("../scripts/workspace_dispatch.py");

/// Marker of the dispatcher's result line.
pub const RESULT_PREFIX: &str = "MESHFERRY_RESULT:";

/// One workspace operation, as sent to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkspaceOp {
    ListFolders { folder: ContentPath },
    ListAssets { folder: ContentPath, recursive: bool },
    AssetExists { path: ContentPath },
    Import { command: ImportCommand },
    RenameAsset { from: ContentPath, to: ContentPath },
    DeleteAsset { path: ContentPath },
    DeleteFolder { path: ContentPath },
    RemoveBackingStorage { path: ContentPath },
    MakeFolder { path: ContentPath },
    SetCollision { path: ContentPath, mode: CollisionMode },
    CollectGarbage,
}

impl WorkspaceOp {
    /// Dispatcher handler name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListFolders { .. } => "list_folders",
            Self::ListAssets { .. } => "list_assets",
            Self::AssetExists { .. } => "asset_exists",
            Self::Import { .. } => "import",
            Self::RenameAsset { .. } => "rename_asset",
            Self::DeleteAsset { .. } => "delete_asset",
            Self::DeleteFolder { .. } => "delete_folder",
            Self::RemoveBackingStorage { .. } => "remove_backing_storage",
            Self::MakeFolder { .. } => "make_folder",
            Self::SetCollision { .. } => "set_collision",
            Self::CollectGarbage => "collect_garbage",
        }
    }

    /// The dispatcher script followed by `run("<payload json>")`.
    ///
    /// A JSON string literal is also a valid Python string literal.
    pub fn render_script(&self) -> Result<String, serde_json::Error> {
        let payload = serde_json::to_string(self)?;
        let literal = serde_json::to_string(&payload)?;
        Ok(format!("{DISPATCHER}\nrun({literal})\n"))
    }
}

#[derive(Debug, Deserialize)]
struct DispatchReply {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Extract the dispatcher value from a command response.
pub fn parse_reply(operation: &str, response: &CommandResponse) -> Result<Value, WorkspaceError> {
    let line = response
        .output
        .iter()
        .flat_map(|entry| entry.output.lines())
        .filter_map(|line| line.trim().strip_prefix(RESULT_PREFIX))
        .last()
        .ok_or_else(|| WorkspaceError::MalformedReply(format!("{operation}: no result line in output")))?;

    let reply: DispatchReply =
        serde_json::from_str(line).map_err(|e| WorkspaceError::MalformedReply(format!("{operation}: {e}")))?;

    if reply.ok {
        Ok(reply.value)
    } else {
        Err(WorkspaceError::Rejected {
            operation: operation.to_string(),
            message: reply.error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// A [`Workspace`] backed by an exclusive command session.
pub struct RemoteWorkspace {
    session: CommandSession,
}

impl RemoteWorkspace {
    pub fn new(session: CommandSession) -> Self {
        Self { session }
    }

    /// The node this workspace lives on.
    pub fn node(&self) -> &DiscoveredNode {
        self.session.node()
    }

    async fn call<T: DeserializeOwned>(&mut self, op: WorkspaceOp) -> Result<T, WorkspaceError> {
        let operation = op.name();
        let script = op.render_script().map_err(RemoteError::from)?;
        debug!(node_id = %self.session.node().node_id, operation, "Running workspace operation");

        let response = self.session.execute(&CommandRequest::script(script)).await?;
        if let Some(warning) = response.warning {
            return Err(WorkspaceError::ConnectionLostAfterSend { warning });
        }
        if !response.success {
            let output = response.output_text();
            let remote_message = if output.is_empty() {
                response.result
            } else {
                format!("{}\n{output}", response.result)
            };
            return Err(WorkspaceError::CommandFailed { remote_message });
        }

        let value = parse_reply(operation, &response)?;
        serde_json::from_value(value).map_err(|e| WorkspaceError::MalformedReply(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl Workspace for RemoteWorkspace {
    async fn list_folders(&mut self, folder: &ContentPath) -> Result<Vec<ContentPath>, WorkspaceError> {
        self.call(WorkspaceOp::ListFolders { folder: folder.clone() }).await
    }

    async fn list_assets(&mut self, folder: &ContentPath, recursive: bool) -> Result<Vec<AssetInfo>, WorkspaceError> {
        self.call(WorkspaceOp::ListAssets {
            folder: folder.clone(),
            recursive,
        })
        .await
    }

    async fn asset_exists(&mut self, path: &ContentPath) -> Result<bool, WorkspaceError> {
        self.call(WorkspaceOp::AssetExists { path: path.clone() }).await
    }

    async fn import(&mut self, command: &ImportCommand) -> Result<Vec<ContentPath>, WorkspaceError> {
        self.call(WorkspaceOp::Import {
            command: command.clone(),
        })
        .await
    }

    async fn rename_asset(&mut self, from: &ContentPath, to: &ContentPath) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::RenameAsset {
            from: from.clone(),
            to: to.clone(),
        })
        .await
    }

    async fn delete_asset(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::DeleteAsset { path: path.clone() }).await
    }

    async fn delete_folder(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::DeleteFolder { path: path.clone() }).await
    }

    async fn remove_backing_storage(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::RemoveBackingStorage { path: path.clone() }).await
    }

    async fn make_folder(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::MakeFolder { path: path.clone() }).await
    }

    async fn set_collision(&mut self, path: &ContentPath, mode: CollisionMode) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::SetCollision {
            path: path.clone(),
            mode,
        })
        .await
    }

    async fn collect_garbage(&mut self) -> Result<(), WorkspaceError> {
        self.call(WorkspaceOp::CollectGarbage).await
    }
}

#[async_trait]
impl WorkspaceSession for RemoteWorkspace {
    async fn close(self: Box<Self>) -> Result<(), WorkspaceError> {
        self.session.close().await.map_err(WorkspaceError::from)
    }
}

/// Opens [`RemoteWorkspace`] sessions through a [`CommandChannel`].
#[derive(Clone)]
pub struct RemoteWorkspaceConnector {
    channel: CommandChannel,
}

impl RemoteWorkspaceConnector {
    pub fn new(channel: CommandChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl WorkspaceConnector for RemoteWorkspaceConnector {
    async fn connect(&self, node: &DiscoveredNode) -> Result<Box<dyn WorkspaceSession>, WorkspaceError> {
        let session = self.channel.open(node).await?;
        Ok(Box::new(RemoteWorkspace::new(session)))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use meshferry_remote::message::OutputEntry;

    use super::*;
    use crate::command::ImportOptions;

    fn payload_of(script: &str) -> WorkspaceOp {
        let call = script.lines().last().expect("line");
        let literal = call
            .strip_prefix("run(")
            .and_then(|rest| rest.strip_suffix(')'))
            .expect("run call");
        let payload: String = serde_json::from_str(literal).expect("literal");
        serde_json::from_str(&payload).expect("payload")
    }

    fn response(lines: &[&str], success: bool) -> CommandResponse {
        CommandResponse {
            success,
            output: lines
                .iter()
                .map(|line| OutputEntry {
                    kind: "Info".to_string(),
                    output: line.to_string(),
                })
                .collect(),
            result: String::new(),
            warning: None,
        }
    }

    #[test]
    fn test_awkward_paths_survive_rendering() {
        let command = ImportCommand::new(
            Path::new(r#"C:\Users\O'Brien\Désktop\"quoted"\Chäir.fbx"#),
            ContentPath::parse("/Game/It's \"here\"").expect("path"),
            "Chäir",
            ImportOptions {
                import_textures: true,
                import_materials: false,
                combine_meshes: true,
                complex_as_simple_collision: true,
            },
        );
        let op = WorkspaceOp::Import { command };
        let script = op.render_script().expect("render");

        assert!(script.starts_with(DISPATCHER));
        assert_eq!(payload_of(&script), op);
        if let WorkspaceOp::Import { command } = payload_of(&script) {
            assert_eq!(command.source_file, r#"C:/Users/O'Brien/Désktop/"quoted"/Chäir.fbx"#);
        }
    }

    #[test]
    fn test_payload_tags() {
        let op = WorkspaceOp::SetCollision {
            path: ContentPath::parse("/Game/A/Chair").expect("path"),
            mode: CollisionMode::ComplexAsSimple,
        };
        let json: Value = serde_json::to_value(&op).expect("json");
        assert_eq!(json["op"], "set_collision");
        assert_eq!(json["mode"], "complex_as_simple");
        assert_eq!(op.name(), "set_collision");

        let json = serde_json::to_value(WorkspaceOp::CollectGarbage).expect("json");
        assert_eq!(json, serde_json::json!({"op": "collect_garbage"}));
    }

    #[test]
    fn test_reply_parsing() {
        let ok = response(&["LogPython: noise", "MESHFERRY_RESULT:{\"ok\": true, \"value\": true}"], true);
        assert_eq!(parse_reply("asset_exists", &ok).expect("value"), Value::Bool(true));

        let unit = response(&["MESHFERRY_RESULT:{\"ok\": true, \"value\": null}\n"], true);
        assert_eq!(parse_reply("make_folder", &unit).expect("value"), Value::Null);

        let rejected = response(&["MESHFERRY_RESULT:{\"ok\": false, \"error\": \"RuntimeError: nope\"}"], true);
        match parse_reply("delete_asset", &rejected) {
            Err(WorkspaceError::Rejected { operation, message }) => {
                assert_eq!(operation, "delete_asset");
                assert_eq!(message, "RuntimeError: nope");
            }
            other => panic!("unexpected {other:?}"),
        }

        let missing = response(&["nothing here"], true);
        assert!(matches!(
            parse_reply("list_assets", &missing),
            Err(WorkspaceError::MalformedReply(_))
        ));
    }
}
