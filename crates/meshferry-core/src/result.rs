//! Convenience result type alias for meshferry.

use crate::error::AppError;

/// A specialized `Result` type for meshferry application-level operations.
pub type AppResult<T> = Result<T, AppError>;
