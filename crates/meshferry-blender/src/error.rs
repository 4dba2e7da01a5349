//! Error types for Blender discovery and conversion.

use meshferry_core::error::{AppError, ErrorKind};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from Blender discovery.
#[derive(Debug, Clone, Error)]
pub enum LocateError {
    /// No Blender executable was found anywhere.
    #[error(
        "Blender not found. Install Blender or set BLENDER_PATH. Searched: {}",
        searched.join(", ")
    )]
    NotFound {
        /// Human-readable list of the locations that were searched.
        searched: Vec<String>,
    },
}

/// Errors from a single headless conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Blender could not be located.
    #[error(transparent)]
    ToolNotFound(#[from] LocateError),

    /// The input file does not exist.
    #[error("Input file not found: {path}")]
    InputNotFound {
        /// The missing input path.
        path: PathBuf,
    },

    /// Blender ran past its deadline and was killed.
    #[error("Blender timed out after {}s and was killed", timeout.as_secs())]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Blender exited with a non-zero status.
    #[error("Blender exited with code {exit_code}: {stderr_tail}")]
    Failed {
        /// Exit code, or -1 when terminated by a signal.
        exit_code: i32,
        /// Last lines of stderr.
        stderr_tail: String,
    },

    /// Blender exited cleanly but the FBX is missing or too small.
    #[error("Blender finished but produced no usable FBX at {path}: {reason}")]
    ProducedNoOutput {
        /// Expected output path.
        path: PathBuf,
        /// Missing or empty.
        reason: String,
    },

    /// Local filesystem or process spawning failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        let kind = match &err {
            ConversionError::ToolNotFound(_) | ConversionError::InputNotFound { .. } => {
                ErrorKind::NotFound
            }
            ConversionError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Conversion,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

impl From<LocateError> for AppError {
    fn from(err: LocateError) -> Self {
        AppError::with_source(ErrorKind::NotFound, err.to_string(), err)
    }
}
