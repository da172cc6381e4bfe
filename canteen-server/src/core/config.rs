//! Server configuration

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;

/// Server configuration, loaded from environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | `HTTP_PORT` | `3000` | HTTP API port |
/// | `WORK_DIR` | `./data` | data directory, database lives here |
/// | `LOG_LEVEL` | `info` | tracing filter |
/// | `LOG_DIR` | unset | daily-rolling file logs when set |
/// | `TIMEZONE` | `Europe/Rome` | canteen wall clock for dates and deadlines |
/// | `ENVIRONMENT` | `development` | `development` / `staging` / `production` |
///
/// JWT settings (`JWT_SECRET`, `JWT_EXPIRATION_MINUTES`, `JWT_ISSUER`,
/// `JWT_AUDIENCE`) are read by [`JwtConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory holding the redb database
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// tracing filter level
    pub log_level: String,
    /// Directory for rolling log files; stdout only when unset
    pub log_dir: Option<String>,
    /// Timezone governing meal dates and service times
    pub timezone: Tz,
    /// Token signing and validation settings
    pub jwt: JwtConfig,
    /// Runtime environment name
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".to_string()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_dir: std::env::var("LOG_DIR").ok(),
            timezone: load_timezone(),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Clone of the environment config with the fields tests care about
    /// swapped out
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Database file inside the work directory
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("canteen.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// `TIMEZONE` from the environment, Europe/Rome when unset or unknown
fn load_timezone() -> Tz {
    match std::env::var("TIMEZONE") {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = %name, "unknown TIMEZONE, using Europe/Rome");
            chrono_tz::Europe::Rome
        }),
        Err(_) => chrono_tz::Europe::Rome,
    }
}
