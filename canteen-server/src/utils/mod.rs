//! Utility modules
//!
//! - [`logger`] - tracing setup (stdout / rolling file, text / JSON)
//! - [`time`] - timezone-aware calendar helpers

pub mod logger;
pub mod time;
