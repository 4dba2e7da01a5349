//! Job failures and their mapping onto the failure taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use meshferry_blender::ConversionError;
use meshferry_core::error::AppError;
use meshferry_core::events::FailureKind;
use meshferry_import::{ReconcileError, ReconcileStep, WorkspaceError};
use meshferry_remote::RemoteError;
use thiserror::Error;

/// Why a job failed.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("{0}")]
    ToolNotFound(String),

    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Conversion timed out after {}s", timeout.as_secs())]
    ConversionTimeout { timeout: Duration },

    #[error("Conversion failed with exit code {exit_code}: {stderr_tail}")]
    ConversionFailed { exit_code: i32, stderr_tail: String },

    #[error("{0}")]
    ConversionProducedNoOutput(String),

    #[error("No running Unreal Editor found within {}s; is Python remote execution enabled?", timeout.as_secs())]
    DiscoveryTimeout { timeout: Duration },

    #[error("Editor channel error: {0}")]
    ChannelError(String),

    #[error("Editor command timed out: {0}")]
    CommandTimeout(String),

    #[error("Editor command failed: {remote_message}")]
    CommandFailed { remote_message: String },

    #[error("Failed to remove leftover staging folders: {0}")]
    StaleCleanupFailure(String),

    #[error("Import failed at {step}: {message}")]
    ReconciliationFailure { step: ReconcileStep, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Taxonomy entry for this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidJob(_) => FailureKind::InvalidJob,
            Self::ToolNotFound(_) => FailureKind::ToolNotFound,
            Self::InputNotFound { .. } => FailureKind::InputNotFound,
            Self::ConversionTimeout { .. } => FailureKind::ConversionTimeout,
            Self::ConversionFailed { .. } => FailureKind::ConversionFailed,
            Self::ConversionProducedNoOutput(_) => FailureKind::ConversionProducedNoOutput,
            Self::DiscoveryTimeout { .. } => FailureKind::DiscoveryTimeout,
            Self::ChannelError(_) => FailureKind::ChannelError,
            Self::CommandTimeout(_) => FailureKind::CommandTimeout,
            Self::CommandFailed { .. } => FailureKind::CommandFailed,
            Self::StaleCleanupFailure(_) => FailureKind::StaleCleanupFailure,
            Self::ReconciliationFailure { .. } => FailureKind::ReconciliationFailure,
            Self::Io(_) => FailureKind::Io,
        }
    }
}

impl From<ConversionError> for JobError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::ToolNotFound(e) => Self::ToolNotFound(e.to_string()),
            ConversionError::InputNotFound { path } => Self::InputNotFound { path },
            ConversionError::Timeout { timeout } => Self::ConversionTimeout { timeout },
            ConversionError::Failed {
                exit_code,
                stderr_tail,
            } => Self::ConversionFailed {
                exit_code,
                stderr_tail,
            },
            e @ ConversionError::ProducedNoOutput { .. } => Self::ConversionProducedNoOutput(e.to_string()),
            ConversionError::Io(e) => Self::Io(e),
        }
    }
}

impl From<RemoteError> for JobError {
    fn from(err: RemoteError) -> Self {
        match err {
            e @ RemoteError::CommandTimeout { .. } => Self::CommandTimeout(e.to_string()),
            e => Self::ChannelError(e.to_string()),
        }
    }
}

impl From<WorkspaceError> for JobError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::Transport(e) => e.into(),
            WorkspaceError::CommandFailed { remote_message } => Self::CommandFailed { remote_message },
            e => Self::ChannelError(e.to_string()),
        }
    }
}

impl From<ReconcileError> for JobError {
    fn from(err: ReconcileError) -> Self {
        let ReconcileError { step, source } = err;
        match source {
            WorkspaceError::Transport(e) => e.into(),
            WorkspaceError::CommandFailed { remote_message } => Self::CommandFailed { remote_message },
            source @ WorkspaceError::ConnectionLostAfterSend { .. } if !step.import_sent() => {
                Self::ChannelError(format!("connection lost during {step}, before the import was sent: {source}"))
            }
            source if step == ReconcileStep::CleanStale => Self::StaleCleanupFailure(source.to_string()),
            source => Self::ReconciliationFailure {
                step,
                message: source.to_string(),
            },
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        let kind = err.kind().error_kind();
        AppError::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_failures_are_tagged_by_step() {
        let stale: JobError = ReconcileError {
            step: ReconcileStep::CleanStale,
            source: WorkspaceError::MalformedReply("x".into()),
        }
        .into();
        assert_eq!(stale.kind(), FailureKind::StaleCleanupFailure);

        let materials: JobError = ReconcileError {
            step: ReconcileStep::Materials,
            source: WorkspaceError::Rejected {
                operation: "rename_asset".into(),
                message: "in use".into(),
            },
        }
        .into();
        assert_eq!(materials.kind(), FailureKind::ReconciliationFailure);
        assert!(materials.to_string().contains("materials"));
    }

    #[test]
    fn test_transport_failures_keep_their_kind() {
        let timeout: JobError = ReconcileError {
            step: ReconcileStep::StageImport,
            source: WorkspaceError::Transport(RemoteError::CommandTimeout {
                timeout: Duration::from_secs(600),
            }),
        }
        .into();
        assert_eq!(timeout.kind(), FailureKind::CommandTimeout);

        let failed: JobError = WorkspaceError::CommandFailed {
            remote_message: "Traceback".into(),
        }
        .into();
        assert_eq!(failed.kind(), FailureKind::CommandFailed);
    }

    #[test]
    fn test_loss_before_import_is_a_channel_error() {
        for step in [ReconcileStep::CleanStale, ReconcileStep::Decide] {
            let err: JobError = ReconcileError {
                step,
                source: WorkspaceError::ConnectionLostAfterSend {
                    warning: "verify manually".into(),
                },
            }
            .into();
            assert_eq!(err.kind(), FailureKind::ChannelError);
        }
    }

    #[test]
    fn test_conversion_errors_map() {
        let err: JobError = ConversionError::Failed {
            exit_code: 3,
            stderr_tail: "boom".into(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::ConversionFailed);
        assert!(err.to_string().contains("exit code 3"));
    }
}
