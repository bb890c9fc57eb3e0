//! REST API module.
//!
//! Success bodies are the bare JSON payload. Failures use the [`AppError`] envelope.

mod posts;

pub use posts::*;

use axum::Json;

use crate::errors::AppError;

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<Json<T>, AppError>;
