//! Application-boundary error.
//!
//! Each crate keeps its own `thiserror` enum; all of them convert into
//! [`AppError`] so the CLI reports failures one way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which stage or subsystem an [`AppError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input file, Blender executable or remote asset missing.
    #[error("not found")]
    NotFound,
    #[error("invalid input")]
    Validation,
    #[error("configuration")]
    Configuration,
    /// Blender ran but the conversion did not produce a usable FBX.
    #[error("conversion")]
    Conversion,
    /// No editor answered within the discovery window.
    #[error("discovery")]
    Discovery,
    #[error("transport")]
    Transport,
    /// The editor executed the command and reported failure.
    #[error("editor")]
    Remote,
    #[error("reconciliation")]
    Reconciliation,
    #[error("i/o")]
    Io,
    #[error("serialization")]
    Serialization,
    /// Another job holds the runner.
    #[error("busy")]
    Busy,
    #[error("internal")]
    Internal,
}

impl ErrorKind {
    /// Suggestion printed under the error, when there is an obvious next step.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::Discovery => Some("enable Python remote execution in the editor's project settings"),
            Self::Busy => Some("wait for the running import to finish"),
            _ => None,
        }
    }
}

/// An error as reported to the user.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a crate-level error, keeping it as the source.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Busy, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        };
        Self::with_source(kind, err.to_string(), err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, format!("invalid JSON: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(ErrorKind::Configuration, err.to_string(), err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(ErrorKind::Validation, format!("invalid configuration: {err}"), err)
    }
}
