//! Canteen Reservation Module
//!
//! Meal catalogue, seat admission and reservation lifecycle:
//!
//! - **types**: domain entities, request payloads and response views
//! - **storage**: redb-based persistence for meals and reservations
//! - **ledger**: in-memory per-meal admission (capacity and deadline)
//! - **catalog**: meal CRUD with calendar rules, synced to the ledger
//! - **lifecycle**: booking state machine and the duplicate guard
//! - **availability**: pure projection of "can this still be booked"
//!
//! # Data Flow
//!
//! ```text
//! Booking  → Lifecycle → Ledger (hold) → Storage (record)
//! Cancel   → Lifecycle → Storage (status) → Ledger (release)
//! Listing  → Catalog → Storage, then Availability × Ledger snapshot
//! Startup  → Catalog.restore + Lifecycle.restore replay the ledger
//! ```
//!
//! The ledger admits, storage remembers: a seat is held before its
//! record is written, and on restart the records rebuild the holds.

pub mod availability;
pub mod catalog;
pub mod ledger;
pub mod lifecycle;
pub mod storage;
pub mod types;

// Re-exports
pub use availability::{AvailabilityView, MealWithAvailability};
pub use catalog::MealCatalog;
pub use ledger::{HoldToken, LedgerError, LedgerSnapshot, Release, ReservationLedger};
pub use lifecycle::ReservationLifecycle;
pub use storage::{CanteenStore, StorageError, StorageResult};
pub use types::{
    Meal, MealCreate, MealFilter, MealPeriod, MealSummary, MealUpdate, Reservation,
    ReservationCreate, ReservationStatus, ReservationView,
};
