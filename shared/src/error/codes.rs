//! Unified error codes for the canteen service
//!
//! This module defines all error codes used across the server and its clients.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Meal errors
//! - 5xxx: Reservation errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 4,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1002,
    /// Token is invalid
    TokenInvalid = 1003,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,
    /// Staff role (admin or teacher) required
    StaffRequired = 2003,
    /// Caller does not own the resource
    NotResourceOwner = 2004,

    // ==================== 4xxx: Meal ====================
    /// Meal not found
    MealNotFound = 4001,
    /// Meal has been disabled
    MealDisabled = 4002,
    /// Meal date is invalid (in the past or malformed)
    InvalidMealDate = 4003,
    /// Reservation deadline is invalid (after service start)
    InvalidDeadline = 4004,
    /// Capacity edit conflicts with existing reservations
    CapacityConflict = 4005,
    /// Meal has reservations, edit not allowed
    MealHasReservations = 4006,

    // ==================== 5xxx: Reservation ====================
    /// Reservation not found
    ReservationNotFound = 5001,
    /// User already holds a reservation for this meal
    DuplicateReservation = 5002,
    /// Meal is fully booked
    CapacityExceeded = 5003,
    /// Reservation deadline has passed
    DeadlinePassed = 5004,
    /// Reservation is already in a terminal state
    AlreadyTerminal = 5005,
    /// Transition not allowed from the current state
    InvalidTransition = 5006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::StaffRequired => "Staff role is required",
            ErrorCode::NotResourceOwner => "Only the owner may modify this resource",

            // Meal
            ErrorCode::MealNotFound => "Meal not found",
            ErrorCode::MealDisabled => "Meal has been disabled",
            ErrorCode::InvalidMealDate => "Meal date is invalid",
            ErrorCode::InvalidDeadline => "Reservation deadline is invalid",
            ErrorCode::CapacityConflict => "Capacity is below the current reservation count",
            ErrorCode::MealHasReservations => "Meal already has reservations",

            // Reservation
            ErrorCode::ReservationNotFound => "Reservation not found",
            ErrorCode::DuplicateReservation => "An active reservation for this meal already exists",
            ErrorCode::CapacityExceeded => "Meal is fully booked",
            ErrorCode::DeadlinePassed => "Reservation deadline has passed",
            ErrorCode::AlreadyTerminal => "Reservation is already cancelled or completed",
            ErrorCode::InvalidTransition => "Transition not allowed from the current state",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::TokenExpired),
            1003 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::AdminRequired),
            2003 => Ok(ErrorCode::StaffRequired),
            2004 => Ok(ErrorCode::NotResourceOwner),

            // Meal
            4001 => Ok(ErrorCode::MealNotFound),
            4002 => Ok(ErrorCode::MealDisabled),
            4003 => Ok(ErrorCode::InvalidMealDate),
            4004 => Ok(ErrorCode::InvalidDeadline),
            4005 => Ok(ErrorCode::CapacityConflict),
            4006 => Ok(ErrorCode::MealHasReservations),

            // Reservation
            5001 => Ok(ErrorCode::ReservationNotFound),
            5002 => Ok(ErrorCode::DuplicateReservation),
            5003 => Ok(ErrorCode::CapacityExceeded),
            5004 => Ok(ErrorCode::DeadlinePassed),
            5005 => Ok(ErrorCode::AlreadyTerminal),
            5006 => Ok(ErrorCode::InvalidTransition),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
