//! Canteen domain models
//!
//! Entities, request payloads and response views for meals and
//! reservations. Entities are what the storage layer persists; views are
//! what the API returns (a reservation's ledger hold never leaves the
//! server).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Meal service period
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealPeriod {
    /// Local wall-clock time at which service starts for this period.
    /// The reservation deadline must fall strictly before this instant.
    pub const fn service_start_hms(&self) -> (u32, u32, u32) {
        match self {
            MealPeriod::Breakfast => (7, 30, 0),
            MealPeriod::Lunch => (12, 30, 0),
            MealPeriod::Dinner => (19, 0, 0),
        }
    }
}

/// Meal entity (one catering offering for a date/period)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    pub period: MealPeriod,
    /// Total seats; never below the number of non-cancelled reservations
    pub capacity: u32,
    #[serde(default)]
    pub vegetarian: bool,
    pub price: Decimal,
    /// Last instant (epoch ms) at which reservations are admitted
    pub deadline: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

/// Create meal payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MealCreate {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub date: NaiveDate,
    pub period: MealPeriod,
    #[validate(range(min = 1))]
    pub capacity: u32,
    #[serde(default)]
    pub vegetarian: bool,
    pub price: Decimal,
    pub deadline: i64,
}

/// Update meal payload (absent fields are left unchanged)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MealUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<MealPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vegetarian: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Availability listing filter (query string on the list endpoints)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub period: Option<MealPeriod>,
    pub search: Option<String>,
}

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Terminal states admit no further transitions
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }

    /// Non-cancelled reservations hold a ledger slot and block rebooking
    pub const fn holds_slot(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }
}

/// Reservation entity
///
/// `hold` is the ledger token backing this reservation's seat,
/// persisted so a restart can rebuild the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub meal_id: i64,
    pub user_id: String,
    pub username: String,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    pub created_at: i64,
    pub hold: Uuid,
}

/// Create reservation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReservationCreate {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub special_requirements: Option<String>,
}

/// Compact meal reference embedded in reservation views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealSummary {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub period: MealPeriod,
}

impl From<&Meal> for MealSummary {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id,
            name: meal.name.clone(),
            date: meal.date,
            period: meal.period,
        }
    }
}

/// Reservation joined with its meal summary (the API-facing shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationView {
    pub id: i64,
    pub meal: MealSummary,
    pub user_id: String,
    pub username: String,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    pub created_at: i64,
}

impl ReservationView {
    pub fn join(reservation: Reservation, meal: &Meal) -> Self {
        Self {
            id: reservation.id,
            meal: MealSummary::from(meal),
            user_id: reservation.user_id,
            username: reservation.username,
            status: reservation.status,
            special_requirements: reservation.special_requirements,
            created_at: reservation.created_at,
        }
    }
}
