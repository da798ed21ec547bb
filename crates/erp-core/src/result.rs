//! Convenience result type alias for the job engine.

use crate::error::AppError;

/// A specialized `Result` type for job engine operations.
pub type AppResult<T> = Result<T, AppError>;
