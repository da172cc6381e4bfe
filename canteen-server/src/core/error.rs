//! Server bootstrap errors
//!
//! Request-path failures use [`shared::AppError`], which knows how to
//! render itself as an HTTP response. This type only covers startup
//! and shutdown, where there is no response to render.

use thiserror::Error;

use crate::canteen::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
