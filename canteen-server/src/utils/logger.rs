//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production
//! environments. Respects `RUST_LOG` when set; otherwise the configured level
//! applies to the whole crate.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger with defaults (stdout, `info`)
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger
///
/// `json` switches to machine-readable output (production); `log_dir`
/// additionally routes output to a daily-rolled file when the directory
/// exists.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let file_appender = log_dir
        .map(Path::new)
        .filter(|path| path.exists())
        .and_then(|path| path.to_str())
        .map(|dir| tracing_appender::rolling::daily(dir, "canteen-server"));

    match (json, file_appender) {
        (true, Some(appender)) => builder.json().with_writer(appender).init(),
        (true, None) => builder.json().init(),
        (false, Some(appender)) => builder.with_writer(appender).init(),
        (false, None) => builder.init(),
    }
}
