//! Error type for the remote-execution client.

use meshferry_core::error::{AppError, ErrorKind};
use std::time::Duration;
use thiserror::Error;

/// Errors from discovery, command sessions and the wire protocol.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Socket setup or I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A frame exceeded the codec's size limit.
    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge {
        /// Maximum buffered frame size.
        limit: usize,
    },

    /// A message violated the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The editor did not connect back in time.
    #[error("Node {node_id} did not open a command connection within {}s", timeout.as_secs())]
    ConnectTimeout {
        /// The node that was asked to connect.
        node_id: String,
        /// The connect-back window.
        timeout: Duration,
    },

    /// A session could not be opened or a command could not be sent.
    #[error("Command channel error while {stage}: {message}")]
    Channel {
        /// `opening` or `transmitting`.
        stage: &'static str,
        /// Underlying failure.
        message: String,
    },

    /// No command result arrived in time.
    #[error("No command result within {}s", timeout.as_secs())]
    CommandTimeout {
        /// The result window.
        timeout: Duration,
    },
}

impl RemoteError {
    /// Wrap a failure that happened while opening a session.
    pub fn opening(err: impl std::fmt::Display) -> Self {
        Self::Channel {
            stage: "opening",
            message: err.to_string(),
        }
    }

    /// Wrap a failure that happened while transmitting a command.
    pub fn transmitting(err: impl std::fmt::Display) -> Self {
        Self::Channel {
            stage: "transmitting",
            message: err.to_string(),
        }
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        let kind = match &err {
            RemoteError::Io(_) => ErrorKind::Io,
            RemoteError::Json(_) => ErrorKind::Serialization,
            _ => ErrorKind::Transport,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
