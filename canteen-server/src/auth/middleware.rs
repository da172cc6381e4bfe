//! Authentication middleware
//!
//! Axum middleware for JWT authentication and role gates.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::{AppError, ErrorCode};
use tracing::warn;

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;

/// Authentication middleware, applied to the whole router
///
/// Extracts and validates the JWT from `Authorization: Bearer <token>`,
/// then injects [`CurrentUser`] into the request extensions.
///
/// # Paths that skip authentication
///
/// - `OPTIONS *` (CORS preflight)
/// - anything outside `/api/` (health probes)
///
/// # Errors
///
/// | Failure                     | Response |
/// |-----------------------------|----------|
/// | Missing Authorization header | 401 NotAuthenticated |
/// | Expired token                | 401 TokenExpired |
/// | Malformed or forged token    | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    // CORS preflight requests carry no credentials
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // Non-API routes skip authentication (and 404 normally)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    let jwt_service = state.get_jwt_service();
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            warn!(uri = %req.uri(), "request without authorization header");
            return Err(AppError::not_authenticated());
        }
    };

    match jwt_service.validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::try_from(claims)?;
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            warn!(error = %e, uri = %req.uri(), "token validation failed");
            Err(e.into())
        }
    }
}

/// Administrator gate for the meal administration routes
///
/// Runs after [`require_auth`], so the user is read from the request
/// extensions. Non-administrators get 403 AdminRequired.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::not_authenticated())?;
    if !user.is_admin() {
        warn!(
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "administrator gate refused"
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}

/// Staff gate for the pickup-desk routes
///
/// Administrators and teachers pass; students get 403 StaffRequired.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::not_authenticated())?;
    if !user.is_staff() {
        warn!(
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "staff gate refused"
        );
        return Err(AppError::new(ErrorCode::StaffRequired));
    }

    Ok(next.run(req).await)
}
