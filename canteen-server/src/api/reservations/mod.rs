//! Reservation API
//!
//! | Route | Access | Handler |
//! |-------|--------|---------|
//! | `POST /api/canteen/reservations/meal/{id}` | any user | [`handler::create`] |
//! | `DELETE /api/canteen/reservations/{id}` | owner or admin | [`handler::cancel`] |
//! | `GET /api/canteen/reservations/user/upcoming` | any user | [`handler::upcoming`] |
//! | `GET /api/canteen/reservations/meal/{id}` | staff | [`handler::roster`] |
//! | `POST /api/canteen/reservations/{id}/complete` | staff | [`handler::complete`] |
//!
//! Ownership on DELETE is enforced inside the lifecycle, not here, so
//! the same route serves students and administrators.

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/canteen/reservations", routes())
}

fn routes() -> Router<ServerState> {
    let user_routes = Router::new()
        .route("/meal/{id}", post(handler::create))
        .route("/{id}", delete(handler::cancel))
        .route("/user/upcoming", get(handler::upcoming));

    let staff_routes = Router::new()
        .route("/meal/{id}", get(handler::roster))
        .route("/{id}/complete", post(handler::complete))
        .layer(middleware::from_fn(require_staff));

    user_routes.merge(staff_routes)
}
