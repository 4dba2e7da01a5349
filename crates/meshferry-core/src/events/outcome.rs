//! Terminal job outcomes and the failure taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Classification of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The job's own fields are invalid.
    InvalidJob,
    /// No Blender executable could be located.
    ToolNotFound,
    /// The input file does not exist.
    InputNotFound,
    /// Blender exceeded its deadline and was killed.
    ConversionTimeout,
    /// Blender exited with a nonzero status.
    ConversionFailed,
    /// Blender exited cleanly but produced no usable FBX.
    ConversionProducedNoOutput,
    /// No editor announced itself within the discovery window.
    DiscoveryTimeout,
    /// The command session could not be opened or the command not sent.
    ChannelError,
    /// No command result arrived within the command timeout.
    CommandTimeout,
    /// The editor reported that a command failed.
    CommandFailed,
    /// Leftover staging folders could not be removed.
    StaleCleanupFailure,
    /// A reconciliation step failed.
    ReconciliationFailure,
    /// A local filesystem operation failed.
    Io,
}

impl FailureKind {
    /// Map to the application-wide error category.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            Self::InvalidJob => ErrorKind::Validation,
            Self::ToolNotFound | Self::InputNotFound => ErrorKind::NotFound,
            Self::ConversionTimeout | Self::ConversionFailed | Self::ConversionProducedNoOutput => {
                ErrorKind::Conversion
            }
            Self::DiscoveryTimeout => ErrorKind::Discovery,
            Self::ChannelError | Self::CommandTimeout => ErrorKind::Transport,
            Self::CommandFailed => ErrorKind::Remote,
            Self::StaleCleanupFailure | Self::ReconciliationFailure => ErrorKind::Reconciliation,
            Self::Io => ErrorKind::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidJob => "invalid job",
            Self::ToolNotFound => "tool not found",
            Self::InputNotFound => "input not found",
            Self::ConversionTimeout => "conversion timeout",
            Self::ConversionFailed => "conversion failed",
            Self::ConversionProducedNoOutput => "conversion produced no output",
            Self::DiscoveryTimeout => "discovery timeout",
            Self::ChannelError => "channel error",
            Self::CommandTimeout => "command timeout",
            Self::CommandFailed => "command failed",
            Self::StaleCleanupFailure => "stale cleanup failure",
            Self::ReconciliationFailure => "reconciliation failure",
            Self::Io => "i/o error",
        };
        f.write_str(label)
    }
}

/// Terminal outcome of a job. Exactly one is reported per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The asset landed in the editor.
    Succeeded {
        /// Summary message.
        message: String,
        /// Set when success could not be confirmed.
        warning: Option<String>,
    },
    /// The job failed.
    Failed {
        /// Failure classification.
        kind: FailureKind,
        /// Error message.
        message: String,
    },
}

impl JobOutcome {
    /// Whether the job succeeded (confirmed or tentative).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_maps_to_error_kind() {
        assert_eq!(FailureKind::ToolNotFound.error_kind(), ErrorKind::NotFound);
        assert_eq!(FailureKind::CommandTimeout.error_kind(), ErrorKind::Transport);
        assert_eq!(
            FailureKind::StaleCleanupFailure.error_kind(),
            ErrorKind::Reconciliation
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = JobOutcome::Failed {
            kind: FailureKind::DiscoveryTimeout,
            message: "no editor".into(),
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "discovery_timeout");
        assert!(!outcome.is_success());
    }
}
