//! Canteen Reservation Server
//!
//! Self-hosted meal reservation service for a company canteen: staff
//! publish the weekly menu, employees book seats, the kitchen works
//! from exact headcounts.
//!
//! # Module structure
//!
//! ```text
//! canteen-server/src/
//! ├── core/       # configuration, shared state, serve loop
//! ├── auth/       # JWT validation, role gates, user extraction
//! ├── canteen/    # storage, seat ledger, catalog, reservation lifecycle
//! ├── api/        # HTTP routes and handlers
//! └── utils/      # logging and calendar helpers
//! ```

pub mod api;
pub mod auth;
pub mod canteen;
pub mod core;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use canteen::{MealCatalog, ReservationLedger, ReservationLifecycle};
pub use core::{Config, Server, ServerState};

// Re-export unified error types from shared
pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, create the log directory when one is configured, and
/// initialize tracing before anything else runs.
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)?;
    }
    let json = std::env::var("ENVIRONMENT")
        .map(|env| env == "production")
        .unwrap_or(false);

    utils::logger::init_logger_with_file(log_level.as_deref(), json, log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
                    __
  _________ _____  / /____  ___  ____
 / ___/ __ `/ __ \/ __/ _ \/ _ \/ __ \
/ /__/ /_/ / / / / /_/  __/  __/ / / /
\___/\__,_/_/ /_/\__/\___/\___/_/ /_/
    "#
    );
}
