//! # meshferry-core
//!
//! Core crate for meshferry. Contains configuration schemas, the import job
//! model, virtual content paths, job progress events, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other meshferry crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
