//! In-memory admission ledger
//!
//! The ledger is the single authority on whether a reservation may be
//! admitted. Every booking first acquires a hold here; storage writes
//! happen only after admission succeeded, outside the ledger lock.
//!
//! # Model
//!
//! Each registered meal owns a [`Seats`] record behind its own mutex,
//! kept in a sharded map. Admission for one meal serializes on that
//! mutex alone, so two meals never contend and the critical section is
//! a few comparisons plus a set insert. Holds are a set of tokens
//! rather than a counter: releasing a hold removes its token, and
//! releasing the same token twice is a visible no-op instead of a
//! silent double-decrement.
//!
//! The ledger never touches the clock itself; callers pass `now` so the
//! deadline decision and its tests are deterministic.

use dashmap::DashMap;
use parking_lot::Mutex;
use shared::{AppError, ErrorCode};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Admission errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Meal not registered: {0}")]
    UnknownMeal(i64),

    #[error("Meal is fully booked")]
    CapacityExceeded,

    #[error("Reservation deadline has passed")]
    DeadlinePassed,

    #[error("Capacity is below the current reservation count ({reserved})")]
    CapacityConflict { reserved: u32 },
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownMeal(meal_id) => {
                AppError::new(ErrorCode::MealNotFound).with_detail("meal_id", meal_id)
            }
            LedgerError::CapacityExceeded => AppError::new(ErrorCode::CapacityExceeded),
            LedgerError::DeadlinePassed => AppError::new(ErrorCode::DeadlinePassed),
            LedgerError::CapacityConflict { reserved } => {
                AppError::new(ErrorCode::CapacityConflict).with_detail("reserved", reserved)
            }
        }
    }
}

/// Proof of admission for one seat of one meal
///
/// Minted by [`ReservationLedger::try_reserve`] and persisted inside the
/// reservation record so a restart can replay it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldToken {
    pub meal_id: i64,
    pub token: Uuid,
}

/// Outcome of releasing a hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The hold existed and its seat is free again
    Freed,
    /// The hold was already gone; nothing changed
    AlreadyReleased,
}

/// Point-in-time view of one meal's admission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub capacity: u32,
    pub reserved: u32,
    pub deadline: i64,
}

/// Per-meal admission state, guarded by its own mutex
struct Seats {
    capacity: u32,
    deadline: i64,
    holds: HashSet<Uuid>,
}

/// Admission ledger over all registered meals
#[derive(Default)]
pub struct ReservationLedger {
    seats: DashMap<i64, Arc<Mutex<Seats>>>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the per-meal mutex out of the shard so the shard guard is
    /// released before the mutex is taken.
    fn seats_for(&self, meal_id: i64) -> Option<Arc<Mutex<Seats>>> {
        self.seats.get(&meal_id).map(|entry| entry.value().clone())
    }

    /// Register a meal with the ledger (new meal or startup replay).
    /// Re-registering updates capacity and deadline but keeps any holds.
    pub fn register(&self, meal_id: i64, capacity: u32, deadline: i64) {
        let seats = self
            .seats
            .entry(meal_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Seats {
                    capacity,
                    deadline,
                    holds: HashSet::new(),
                }))
            })
            .clone();

        let mut seats = seats.lock();
        seats.capacity = capacity;
        seats.deadline = deadline;
    }

    /// Atomic check-and-admit for one seat
    ///
    /// Checks run in a fixed order under the meal's mutex: deadline
    /// first, then capacity. `now` at or past the deadline is rejected,
    /// so the deadline itself is the first refused instant.
    pub fn try_reserve(&self, meal_id: i64, now: i64) -> Result<HoldToken, LedgerError> {
        let seats = self
            .seats_for(meal_id)
            .ok_or(LedgerError::UnknownMeal(meal_id))?;
        let mut seats = seats.lock();

        if now >= seats.deadline {
            return Err(LedgerError::DeadlinePassed);
        }
        if seats.holds.len() as u32 >= seats.capacity {
            return Err(LedgerError::CapacityExceeded);
        }

        let token = Uuid::new_v4();
        seats.holds.insert(token);
        Ok(HoldToken { meal_id, token })
    }

    /// Release a hold, freeing its seat
    ///
    /// Idempotent: releasing a token that is already gone reports
    /// [`Release::AlreadyReleased`] and leaves the count untouched.
    pub fn release(&self, hold: &HoldToken) -> Release {
        let Some(seats) = self.seats_for(hold.meal_id) else {
            return Release::AlreadyReleased;
        };
        let mut seats = seats.lock();

        if seats.holds.remove(&hold.token) {
            Release::Freed
        } else {
            Release::AlreadyReleased
        }
    }

    /// Replay a persisted hold during startup rebuild
    ///
    /// Persisted reservations are facts; no deadline or capacity check
    /// applies here.
    pub fn restore_hold(&self, meal_id: i64, token: Uuid) -> Result<(), LedgerError> {
        let seats = self
            .seats_for(meal_id)
            .ok_or(LedgerError::UnknownMeal(meal_id))?;
        seats.lock().holds.insert(token);
        Ok(())
    }

    /// Consistent point-in-time view of one meal
    pub fn snapshot(&self, meal_id: i64) -> Option<LedgerSnapshot> {
        let seats = self.seats_for(meal_id)?;
        let seats = seats.lock();
        Some(LedgerSnapshot {
            capacity: seats.capacity,
            reserved: seats.holds.len() as u32,
            deadline: seats.deadline,
        })
    }

    /// Change a meal's capacity
    ///
    /// Refused when the new capacity is below the current hold count;
    /// admitted reservations are never invalidated by an admin edit.
    pub fn set_capacity(&self, meal_id: i64, capacity: u32) -> Result<(), LedgerError> {
        let seats = self
            .seats_for(meal_id)
            .ok_or(LedgerError::UnknownMeal(meal_id))?;
        let mut seats = seats.lock();

        let reserved = seats.holds.len() as u32;
        if capacity < reserved {
            return Err(LedgerError::CapacityConflict { reserved });
        }
        seats.capacity = capacity;
        Ok(())
    }

    /// Change a meal's deadline (takes effect on the next admission)
    pub fn set_deadline(&self, meal_id: i64, deadline: i64) -> Result<(), LedgerError> {
        let seats = self
            .seats_for(meal_id)
            .ok_or(LedgerError::UnknownMeal(meal_id))?;
        seats.lock().deadline = deadline;
        Ok(())
    }

    /// Number of meals registered with the ledger
    pub fn registered_meals(&self) -> usize {
        self.seats.len()
    }

    /// Total holds across all meals
    pub fn active_holds(&self) -> usize {
        self.seats
            .iter()
            .map(|entry| entry.value().lock().holds.len())
            .sum()
    }
}
