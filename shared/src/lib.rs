//! Shared types for the session authentication workspace
//!
//! Types used on both sides of the wire: the unified error system,
//! auth request/response DTOs and small time utilities.

pub mod client;
pub mod error;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use error::{AppError, ErrorCategory, ErrorCode, ErrorResponse};
pub use http;
pub use serde::{Deserialize, Serialize};
