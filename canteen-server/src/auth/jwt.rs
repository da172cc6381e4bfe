//! JWT token service
//!
//! Generates, validates and decodes the HS256 bearer tokens issued for
//! canteen accounts. Token issuance normally happens in the identity
//! system; this service shares its secret so tooling and tests can mint
//! tokens locally.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signing secret (at least 32 bytes)
    pub secret: String,
    /// Token lifetime in minutes
    pub expiration_minutes: i64,
    /// Expected `iss` claim
    pub issuer: String,
    /// Expected `aud` claim
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        let secret = match load_jwt_secret() {
            Ok(secret) => secret,
            Err(e) => {
                #[cfg(debug_assertions)]
                {
                    tracing::warn!("JWT configuration error: {}, using a generated key", e);
                    generate_dev_secret()
                }
                #[cfg(not(debug_assertions))]
                {
                    panic!("FATAL: JWT_SECRET configuration failed: {}", e);
                }
            }
        };

        Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1440), // 24 hours
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "canteen-server".to_string()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "canteen-api".to_string()),
        }
    }
}

/// Claims carried in every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (subject)
    pub sub: String,
    /// Display name
    pub username: String,
    /// Role name, one of the `ROLE_*` values
    pub role: String,
    /// Expiry timestamp (seconds)
    pub exp: i64,
    /// Issued-at timestamp (seconds)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

/// JWT errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::ExpiredToken => AppError::new(ErrorCode::TokenExpired),
            JwtError::InvalidSignature => AppError::new(ErrorCode::TokenInvalid),
            JwtError::InvalidToken(msg) => AppError::with_message(ErrorCode::TokenInvalid, msg),
            JwtError::GenerationFailed(msg) => {
                AppError::with_message(ErrorCode::InternalError, msg)
            }
            JwtError::ConfigError(msg) => AppError::with_message(ErrorCode::ConfigError, msg),
        }
    }
}

/// Random printable secret for development runs
pub fn generate_dev_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Load the signing secret from the environment
///
/// A missing secret is tolerated in debug builds only; a short one never.
fn load_jwt_secret() -> Result<String, JwtError> {
    match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            if secret.len() < 32 {
                return Err(JwtError::ConfigError(
                    "JWT_SECRET must be at least 32 characters long".to_string(),
                ));
            }
            Ok(secret)
        }
        Err(_) => {
            #[cfg(debug_assertions)]
            {
                tracing::warn!("JWT_SECRET not set, generating a temporary development key");
                Ok(generate_dev_secret())
            }
            #[cfg(not(debug_assertions))]
            {
                Err(JwtError::ConfigError(
                    "JWT_SECRET environment variable must be set in production".to_string(),
                ))
            }
        }
    }
}

/// Account role carried in the `role` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_TEACHER")]
    Teacher,
    #[serde(rename = "ROLE_STUDENT")]
    Student,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Teacher => "ROLE_TEACHER",
            Role::Student => "ROLE_STUDENT",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_ADMIN" => Ok(Role::Admin),
            "ROLE_TEACHER" => Ok(Role::Teacher),
            "ROLE_STUDENT" => Ok(Role::Student),
            other => Err(JwtError::InvalidToken(format!("unknown role: {other}"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT token service
#[derive(Debug, Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create the service from environment configuration
    pub fn new() -> Self {
        Self::with_config(JwtConfig::default())
    }

    /// Create the service from an explicit configuration
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Mint a token for a user
    pub fn generate_token(
        &self,
        user_id: &str,
        username: &str,
        role: Role,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.as_str().to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Extract the token from an Authorization header value
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

impl Default for JwtService {
    fn default() -> Self {
        Self::new()
    }
}

/// Current user context resolved from validated claims
///
/// Created by the auth middleware and injected into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// User id
    pub id: String,
    /// Display name
    pub username: String,
    /// Account role
    pub role: Role,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            role: claims.role.parse()?,
            id: claims.sub,
            username: claims.username,
        })
    }
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Staff run the pickup desk: administrators and teachers
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Teacher)
    }
}
