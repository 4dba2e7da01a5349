//! Workspace and reconciliation errors.

use std::fmt;

use meshferry_core::error::{AppError, ErrorKind};
use meshferry_remote::RemoteError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a single workspace operation.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The editor ran the operation and reported a failure.
    #[error("Editor rejected {operation}: {message}")]
    Rejected {
        /// Operation name.
        operation: String,
        /// Editor-side message.
        message: String,
    },

    /// The command raised inside the editor.
    #[error("Editor command failed: {remote_message}")]
    CommandFailed {
        /// Exception text and output.
        remote_message: String,
    },

    /// The connection dropped after the command was sent; it probably ran.
    #[error("{warning}")]
    ConnectionLostAfterSend {
        /// Warning for the user.
        warning: String,
    },

    /// Session transport failure.
    #[error(transparent)]
    Transport(#[from] RemoteError),

    /// The editor replied without a readable result.
    #[error("Malformed editor reply: {0}")]
    MalformedReply(String),
}

/// Reconciliation steps, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStep {
    /// Sweeping leftover staging folders.
    CleanStale,
    /// Checking whether the asset already exists.
    Decide,
    /// Importing over the existing asset.
    Reimport,
    /// Importing into the staging folder.
    StageImport,
    /// Moving staged assets to their final paths.
    MoveFromStaging,
    /// Removing the staging folder.
    RemoveStaging,
    /// Setting collision on imported meshes.
    Collision,
    /// Moving materials into the materials folder.
    Materials,
}

impl ReconcileStep {
    /// Whether the import command has been transmitted once this step runs.
    pub fn import_sent(self) -> bool {
        !matches!(self, Self::CleanStale | Self::Decide)
    }
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CleanStale => "clean_stale",
            Self::Decide => "decide",
            Self::Reimport => "reimport",
            Self::StageImport => "stage_import",
            Self::MoveFromStaging => "move_from_staging",
            Self::RemoveStaging => "remove_staging",
            Self::Collision => "collision",
            Self::Materials => "materials",
        };
        f.write_str(name)
    }
}

/// A reconciliation failure tagged with the step that failed.
#[derive(Debug, Error)]
#[error("Import reconciliation failed at {step}: {source}")]
pub struct ReconcileError {
    /// The failing step.
    pub step: ReconcileStep,
    /// The workspace failure.
    #[source]
    pub source: WorkspaceError,
}

impl ReconcileError {
    /// Tag a workspace error with its step.
    pub fn at(step: ReconcileStep) -> impl FnOnce(WorkspaceError) -> Self {
        move |source| Self { step, source }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        let kind = match &err.source {
            WorkspaceError::Transport(_) | WorkspaceError::ConnectionLostAfterSend { .. } => {
                ErrorKind::Transport
            }
            WorkspaceError::CommandFailed { .. } => ErrorKind::Remote,
            _ => ErrorKind::Reconciliation,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
