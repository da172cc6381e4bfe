//! JWT extractor
//!
//! Axum extractor resolving [`CurrentUser`] inside protected handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::AppError;
use tracing::warn;

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;

/// Resolve the current user for a handler argument
///
/// The auth middleware normally runs first and leaves the user in the
/// request extensions; the header path below only fires for routes
/// mounted outside that middleware.
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                warn!(uri = %parts.uri, "request without authorization header");
                return Err(AppError::not_authenticated());
            }
        };

        match state.get_jwt_service().validate_token(token) {
            Ok(claims) => {
                let user = CurrentUser::try_from(claims)?;
                // Cache for any later extraction in the same request
                parts.extensions.insert(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, uri = %parts.uri, "token validation failed");
                Err(e.into())
            }
        }
    }
}
