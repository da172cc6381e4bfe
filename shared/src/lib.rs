//! Shared types for the canteen service
//!
//! Common types used across crates: the unified error system, the API
//! response envelope, and id/time utilities.

pub mod error;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use util::{now_millis, snowflake_id};
