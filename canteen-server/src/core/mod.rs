//! Core server modules
//!
//! - [`config`] - environment-driven configuration
//! - [`error`] - startup/shutdown error type
//! - [`server`] - router assembly and the serve loop
//! - [`state`] - shared state handed to every handler

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
