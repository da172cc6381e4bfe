//! Meal catalog handlers
//!
//! Thin wrappers over [`MealCatalog`](crate::canteen::MealCatalog):
//! validate the payload, stamp the current time, delegate.

use axum::extract::{Path, Query, State};
use axum::Json;
use validator::Validate;

use shared::{ApiResponse, AppError, AppResult};

use crate::canteen::{Meal, MealCreate, MealFilter, MealUpdate, MealWithAvailability};
use crate::core::ServerState;

/// List bookable meals, optionally filtered by date range, period or
/// a name/description search term
pub async fn list_available(
    State(state): State<ServerState>,
    Query(filter): Query<MealFilter>,
) -> AppResult<ApiResponse<Vec<MealWithAvailability>>> {
    let meals = state
        .catalog
        .list_available(&filter, shared::now_millis())?;
    Ok(ApiResponse::success(meals))
}

/// Fetch one meal with its live availability
pub async fn get_meal(
    State(state): State<ServerState>,
    Path(meal_id): Path<i64>,
) -> AppResult<ApiResponse<MealWithAvailability>> {
    let meal = state.catalog.get(meal_id, shared::now_millis())?;
    Ok(ApiResponse::success(meal))
}

/// Full catalog for administrators, disabled and past meals included
pub async fn list_all(
    State(state): State<ServerState>,
) -> AppResult<ApiResponse<Vec<MealWithAvailability>>> {
    let meals = state.catalog.list_all(shared::now_millis())?;
    Ok(ApiResponse::success(meals))
}

/// Publish a meal
pub async fn create_meal(
    State(state): State<ServerState>,
    Json(payload): Json<MealCreate>,
) -> AppResult<ApiResponse<Meal>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let meal = state.catalog.create(payload, shared::now_millis())?;
    Ok(ApiResponse::success_with_message("Meal created", meal))
}

/// Update a meal; capacity changes are checked against seats already taken
pub async fn update_meal(
    State(state): State<ServerState>,
    Path(meal_id): Path<i64>,
    Json(payload): Json<MealUpdate>,
) -> AppResult<ApiResponse<Meal>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let meal = state.catalog.update(meal_id, payload, shared::now_millis())?;
    Ok(ApiResponse::success(meal))
}

/// Soft-disable a meal so it stops taking reservations
pub async fn disable_meal(
    State(state): State<ServerState>,
    Path(meal_id): Path<i64>,
) -> AppResult<ApiResponse<Meal>> {
    let meal = state.catalog.disable(meal_id)?;
    Ok(ApiResponse::success_with_message("Meal disabled", meal))
}
