//! Authentication and authorization
//!
//! JWT authentication with role gates:
//! - [`JwtService`] - token generation and validation
//! - [`CurrentUser`] - authenticated user context
//! - [`require_auth`] - authentication middleware
//! - [`require_admin`] / [`require_staff`] - role gates for the
//!   administration and pickup-desk route groups

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService, Role};
pub use middleware::{require_admin, require_auth, require_staff};
