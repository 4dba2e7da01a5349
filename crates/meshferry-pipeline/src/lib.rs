//! Job orchestration for meshferry.
//!
//! This crate provides:
//! - The [`MeshConverter`] seam over the headless conversion stage
//! - A [`PipelineOrchestrator`] that runs one job end to end
//! - A [`PipelineRunner`] that runs one job at a time on a background task
//! - A [`JobReporter`] that streams progress and status events

pub mod converter;
pub mod error;
pub mod orchestrator;
pub mod reporter;
pub mod runner;

pub use converter::MeshConverter;
pub use error::JobError;
pub use orchestrator::{PipelineOrchestrator, PipelineSettings};
pub use reporter::JobReporter;
pub use runner::{JobHandle, PipelineRunner};
