//! Reservation handlers
//!
//! Booking and cancellation delegate to
//! [`ReservationLifecycle`](crate::canteen::ReservationLifecycle), which
//! owns admission, the duplicate guard and the status machine.

use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use shared::{ApiResponse, AppError, AppResult};

use crate::auth::CurrentUser;
use crate::canteen::{Reservation, ReservationCreate, ReservationView};
use crate::core::ServerState;
use crate::utils::time;

/// Book a seat at a meal for the requesting user
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(meal_id): Path<i64>,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<ApiResponse<Reservation>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let reservation = state.lifecycle.create(
        meal_id,
        &user.id,
        &user.username,
        payload,
        shared::now_millis(),
    )?;
    Ok(ApiResponse::success_with_message(
        "Reservation confirmed",
        reservation,
    ))
}

/// Cancel a reservation and free its seat
///
/// Students can cancel their own; administrators can cancel anyone's.
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(reservation_id): Path<i64>,
) -> AppResult<ApiResponse<Reservation>> {
    let reservation = state
        .lifecycle
        .cancel(reservation_id, &user.id, user.is_admin())?;
    Ok(ApiResponse::success_with_message(
        "Reservation cancelled",
        reservation,
    ))
}

/// The requesting user's active reservations for today onwards
pub async fn upcoming(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<Vec<ReservationView>>> {
    let today = time::today(state.config.timezone);
    let reservations = state.lifecycle.list_for_user_upcoming(&user.id, today)?;
    Ok(ApiResponse::success(reservations))
}

/// Everyone booked on a meal, newest first (staff view)
pub async fn roster(
    State(state): State<ServerState>,
    Path(meal_id): Path<i64>,
) -> AppResult<ApiResponse<Vec<ReservationView>>> {
    let reservations = state.lifecycle.list_for_meal(meal_id)?;
    Ok(ApiResponse::success(reservations))
}

/// Mark a reservation as served at the counter
pub async fn complete(
    State(state): State<ServerState>,
    Path(reservation_id): Path<i64>,
) -> AppResult<ApiResponse<Reservation>> {
    let reservation = state.lifecycle.complete(reservation_id)?;
    Ok(ApiResponse::success_with_message(
        "Reservation completed",
        reservation,
    ))
}
