//! Core type definitions used across the meshferry workspace.

pub mod content_path;
pub mod id;
pub mod job;

pub use content_path::{ContentPath, ContentPathError};
pub use id::JobId;
pub use job::{ImportFlags, ImportJob};
