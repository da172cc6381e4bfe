//! Meal Catalog API
//!
//! | Route | Access | Handler |
//! |-------|--------|---------|
//! | `GET /api/canteen/meals/available` | any user | [`handler::list_available`] |
//! | `GET /api/canteen/meals/{id}` | any user | [`handler::get_meal`] |
//! | `GET /api/canteen/meals` | admin | [`handler::list_all`] |
//! | `POST /api/canteen/meals` | admin | [`handler::create_meal`] |
//! | `PUT /api/canteen/meals/{id}` | admin | [`handler::update_meal`] |
//! | `DELETE /api/canteen/meals/{id}` | admin | [`handler::disable_meal`] |
//!
//! DELETE disables rather than removes, so past reservations keep a
//! meal to point at.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/canteen/meals", routes())
}

fn routes() -> Router<ServerState> {
    let user_routes = Router::new()
        .route("/available", get(handler::list_available))
        .route("/{id}", get(handler::get_meal));

    let admin_routes = Router::new()
        .route("/", get(handler::list_all).post(handler::create_meal))
        .route("/{id}", put(handler::update_meal).delete(handler::disable_meal))
        .layer(middleware::from_fn(require_admin));

    user_routes.merge(admin_routes)
}
