//! Reservation lifecycle
//!
//! Drives a reservation through its states and keeps the three sources
//! of truth aligned: the admission ledger (seats), the store (records)
//! and the in-memory pair map (one active reservation per user and
//! meal).
//!
//! ```text
//! PENDING -> CONFIRMED -> COMPLETED
//!    |           |
//!    +-----------+--> CANCELLED
//! ```
//!
//! Booking goes through the ledger first and storage second: a seat is
//! held before the record is written, and the hold is released if the
//! write fails. Cancelling is the mirror image: the record flips to
//! CANCELLED durably, then the seat is freed. A crash between the two
//! steps can only leave a seat transiently held, never oversold, and
//! the startup replay restores the exact persisted state.

use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::{AppError, AppResult, ErrorCode};
use std::sync::Arc;
use tracing::warn;

use super::ledger::{HoldToken, Release, ReservationLedger};
use super::storage::CanteenStore;
use super::types::{Reservation, ReservationCreate, ReservationStatus, ReservationView};

pub struct ReservationLifecycle {
    store: CanteenStore,
    ledger: Arc<ReservationLedger>,
    /// (meal_id, user_id) -> reservation_id for every non-cancelled
    /// reservation; claiming a pair is what makes double-booking
    /// impossible under concurrency
    pairs: DashMap<(i64, String), i64>,
}

impl ReservationLifecycle {
    pub fn new(store: CanteenStore, ledger: Arc<ReservationLedger>) -> Self {
        Self {
            store,
            ledger,
            pairs: DashMap::new(),
        }
    }

    /// Book one seat for a user
    ///
    /// Order matters: claim the (meal, user) pair, acquire the seat,
    /// persist the record, in that sequence. Each failure step unwinds
    /// what came before it, and a crash mid-way self-heals on restart
    /// because only persisted reservations are replayed.
    pub fn create(
        &self,
        meal_id: i64,
        user_id: &str,
        username: &str,
        req: ReservationCreate,
        now: i64,
    ) -> AppResult<Reservation> {
        let meal = self
            .store
            .get_meal(meal_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MealNotFound))?;
        if !meal.enabled {
            return Err(AppError::new(ErrorCode::MealDisabled));
        }

        let reservation_id = shared::util::snowflake_id();
        let pair = (meal_id, user_id.to_string());

        // Atomic pair claim; the shard guard is dropped right away
        match self.pairs.entry(pair.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::new(ErrorCode::DuplicateReservation));
            }
            Entry::Vacant(slot) => {
                slot.insert(reservation_id);
            }
        }

        let hold = match self.ledger.try_reserve(meal_id, now) {
            Ok(hold) => hold,
            Err(err) => {
                self.pairs.remove(&pair);
                return Err(err.into());
            }
        };

        let reservation = Reservation {
            id: reservation_id,
            meal_id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            status: ReservationStatus::Confirmed,
            special_requirements: req.special_requirements,
            created_at: now,
            hold: hold.token,
        };

        if let Err(err) = self.store.insert_reservation(&reservation) {
            self.ledger.release(&hold);
            self.pairs.remove(&pair);
            return Err(err.into());
        }

        Ok(reservation)
    }

    /// Cancel a reservation, freeing its seat
    ///
    /// The owner may cancel their own reservation; an administrator may
    /// cancel any. The status flips durably first, then the seat is
    /// released and the pair cleared so the user can book this meal
    /// again.
    pub fn cancel(&self, reservation_id: i64, actor_id: &str, admin: bool) -> AppResult<Reservation> {
        let txn = self.store.begin_write()?;
        let Some(mut reservation) = self.store.get_reservation_txn(&txn, reservation_id)? else {
            return Err(AppError::new(ErrorCode::ReservationNotFound));
        };

        if reservation.user_id != actor_id && !admin {
            return Err(AppError::new(ErrorCode::NotResourceOwner));
        }
        if reservation.status.is_terminal() {
            return Err(AppError::new(ErrorCode::AlreadyTerminal));
        }

        reservation.status = ReservationStatus::Cancelled;
        self.store.put_reservation(&txn, &reservation)?;
        txn.commit()
            .map_err(super::storage::StorageError::Commit)?;

        let hold = HoldToken {
            meal_id: reservation.meal_id,
            token: reservation.hold,
        };
        if self.ledger.release(&hold) == Release::AlreadyReleased {
            warn!(reservation_id, "hold already released when cancelling");
        }
        self.pairs
            .remove_if(&(reservation.meal_id, reservation.user_id.clone()), |_, id| {
                *id == reservation.id
            });

        Ok(reservation)
    }

    /// Confirm a pending reservation (deferred-confirmation flow; the
    /// booking path confirms directly)
    pub fn confirm(&self, reservation_id: i64) -> AppResult<Reservation> {
        self.advance(reservation_id, |status| match status {
            ReservationStatus::Pending => Ok(ReservationStatus::Confirmed),
            s if s.is_terminal() => Err(AppError::new(ErrorCode::AlreadyTerminal)),
            _ => Err(AppError::new(ErrorCode::InvalidTransition)),
        })
    }

    /// Mark a confirmed reservation as served (staff operation)
    pub fn complete(&self, reservation_id: i64) -> AppResult<Reservation> {
        self.advance(reservation_id, |status| match status {
            ReservationStatus::Confirmed => Ok(ReservationStatus::Completed),
            s if s.is_terminal() => Err(AppError::new(ErrorCode::AlreadyTerminal)),
            _ => Err(AppError::new(ErrorCode::InvalidTransition)),
        })
    }

    /// Check-and-set a status transition in one write transaction
    fn advance(
        &self,
        reservation_id: i64,
        step: impl Fn(ReservationStatus) -> AppResult<ReservationStatus>,
    ) -> AppResult<Reservation> {
        let txn = self.store.begin_write()?;
        let Some(mut reservation) = self.store.get_reservation_txn(&txn, reservation_id)? else {
            return Err(AppError::new(ErrorCode::ReservationNotFound));
        };

        reservation.status = step(reservation.status)?;
        self.store.put_reservation(&txn, &reservation)?;
        txn.commit()
            .map_err(super::storage::StorageError::Commit)?;
        Ok(reservation)
    }

    /// A user's active reservations for meals not yet served, joined
    /// with their meal and ordered by service date then period
    pub fn list_for_user_upcoming(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> AppResult<Vec<ReservationView>> {
        let mut upcoming = Vec::new();
        for reservation in self.store.reservations_for_user(user_id)? {
            if reservation.status.is_terminal() {
                continue;
            }
            let Some(meal) = self.store.get_meal(reservation.meal_id)? else {
                warn!(
                    reservation_id = reservation.id,
                    meal_id = reservation.meal_id,
                    "reservation references a missing meal"
                );
                continue;
            };
            if meal.date >= today {
                upcoming.push(ReservationView::join(reservation, &meal));
            }
        }
        upcoming.sort_by_key(|view| (view.meal.date, view.meal.period));
        Ok(upcoming)
    }

    /// Roster for one meal, newest first (staff view, all statuses)
    pub fn list_for_meal(&self, meal_id: i64) -> AppResult<Vec<ReservationView>> {
        let meal = self
            .store
            .get_meal(meal_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MealNotFound))?;
        let mut roster: Vec<ReservationView> = self
            .store
            .reservations_for_meal(meal_id)?
            .into_iter()
            .map(|reservation| ReservationView::join(reservation, &meal))
            .collect();
        roster.sort_by_key(|view| std::cmp::Reverse((view.created_at, view.id)));
        Ok(roster)
    }

    /// Replay persisted reservations into the ledger and the pair map
    /// (startup). Returns the number of holds restored.
    pub fn restore(&self) -> AppResult<usize> {
        let mut restored = 0;
        for reservation in self.store.list_reservations()? {
            if !reservation.status.holds_slot() {
                continue;
            }
            match self.ledger.restore_hold(reservation.meal_id, reservation.hold) {
                Ok(()) => {
                    self.pairs.insert(
                        (reservation.meal_id, reservation.user_id.clone()),
                        reservation.id,
                    );
                    restored += 1;
                }
                Err(err) => warn!(
                    reservation_id = reservation.id,
                    meal_id = reservation.meal_id,
                    %err,
                    "skipping reservation during replay"
                ),
            }
        }
        Ok(restored)
    }

    /// Number of active (meal, user) pairs
    pub fn active_pairs(&self) -> usize {
        self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canteen::catalog::MealCatalog;
    use crate::canteen::types::{Meal, MealCreate, MealPeriod};
    use crate::utils::time;
    use chrono_tz::Tz;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    const TZ: Tz = chrono_tz::Europe::Rome;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_now() -> i64 {
        time::date_hms_to_millis(date(2026, 8, 1), 8, 0, 0, TZ)
    }

    struct Stack {
        store: CanteenStore,
        catalog: MealCatalog,
        lifecycle: ReservationLifecycle,
        ledger: Arc<ReservationLedger>,
    }

    fn test_stack() -> Stack {
        let store = CanteenStore::open_in_memory().unwrap();
        let ledger = Arc::new(ReservationLedger::new());
        Stack {
            catalog: MealCatalog::new(store.clone(), ledger.clone(), TZ),
            lifecycle: ReservationLifecycle::new(store.clone(), ledger.clone()),
            store,
            ledger,
        }
    }

    fn make_meal(catalog: &MealCatalog, capacity: u32) -> Meal {
        catalog
            .create(
                MealCreate {
                    name: "Gnocchi al gorgonzola".to_string(),
                    description: String::new(),
                    date: date(2026, 9, 1),
                    period: MealPeriod::Lunch,
                    capacity,
                    vegetarian: true,
                    price: Decimal::new(500, 2),
                    deadline: time::date_hms_to_millis(date(2026, 9, 1), 10, 0, 0, TZ),
                },
                test_now(),
            )
            .unwrap()
    }

    fn book(stack: &Stack, meal_id: i64, user: &str) -> AppResult<Reservation> {
        stack.lifecycle.create(
            meal_id,
            user,
            user,
            ReservationCreate::default(),
            test_now(),
        )
    }

    #[test]
    fn test_create_confirms_and_holds_a_seat() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);

        let reservation = book(&stack, meal.id, "alice").unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.meal_id, meal.id);

        assert_eq!(stack.ledger.snapshot(meal.id).unwrap().reserved, 1);
        assert_eq!(stack.lifecycle.active_pairs(), 1);

        let stored = stack.store.get_reservation(reservation.id).unwrap().unwrap();
        assert_eq!(stored.hold, reservation.hold);
    }

    #[test]
    fn test_create_unknown_meal() {
        let stack = test_stack();
        let err = book(&stack, 404, "alice").unwrap_err();
        assert_eq!(err.code, ErrorCode::MealNotFound);
    }

    #[test]
    fn test_create_disabled_meal() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);
        stack.catalog.disable(meal.id).unwrap();

        let err = book(&stack, meal.id, "alice").unwrap_err();
        assert_eq!(err.code, ErrorCode::MealDisabled);
        assert_eq!(stack.ledger.snapshot(meal.id).unwrap().reserved, 0);
    }

    #[test]
    fn test_create_after_deadline() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);

        let err = stack
            .lifecycle
            .create(
                meal.id,
                "alice",
                "alice",
                ReservationCreate::default(),
                meal.deadline,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeadlinePassed);

        // Failed admission leaves no trace
        assert_eq!(stack.lifecycle.active_pairs(), 0);
        assert!(stack.lifecycle.list_for_meal(meal.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_full_meal() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 1);

        book(&stack, meal.id, "alice").unwrap();
        let err = book(&stack, meal.id, "bob").unwrap_err();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);

        // The refused booking did not leave a pair claim behind
        assert_eq!(stack.lifecycle.active_pairs(), 1);
    }

    #[test]
    fn test_duplicate_guard() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);

        book(&stack, meal.id, "alice").unwrap();
        let err = book(&stack, meal.id, "alice").unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateReservation);

        // One seat, not two
        assert_eq!(stack.ledger.snapshot(meal.id).unwrap().reserved, 1);
    }

    #[test]
    fn test_cancel_frees_seat_for_others() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 1);

        let alice = book(&stack, meal.id, "alice").unwrap();
        assert_eq!(
            book(&stack, meal.id, "bob").unwrap_err().code,
            ErrorCode::CapacityExceeded
        );

        let cancelled = stack.lifecycle.cancel(alice.id, "alice", false).unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(stack.ledger.snapshot(meal.id).unwrap().reserved, 0);

        assert!(book(&stack, meal.id, "bob").is_ok());
    }

    #[test]
    fn test_cancel_then_rebook_same_user() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);

        let first = book(&stack, meal.id, "alice").unwrap();
        stack.lifecycle.cancel(first.id, "alice", false).unwrap();

        // The pair is free again; a new independent reservation works
        let second = book(&stack, meal.id, "alice").unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(stack.ledger.snapshot(meal.id).unwrap().reserved, 1);

        // The cancelled record is still on file
        let stored = stack.store.get_reservation(first.id).unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn test_cancel_requires_owner_or_admin() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);
        let reservation = book(&stack, meal.id, "alice").unwrap();

        let err = stack
            .lifecycle
            .cancel(reservation.id, "bob", false)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotResourceOwner);

        // An administrator may cancel on the user's behalf
        let cancelled = stack.lifecycle.cancel(reservation.id, "bob", true).unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn test_cancel_is_not_repeatable() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);
        let reservation = book(&stack, meal.id, "alice").unwrap();

        stack.lifecycle.cancel(reservation.id, "alice", false).unwrap();
        let err = stack
            .lifecycle
            .cancel(reservation.id, "alice", false)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyTerminal);

        // The double cancel freed exactly one seat
        assert_eq!(stack.ledger.snapshot(meal.id).unwrap().reserved, 0);
    }

    #[test]
    fn test_cancel_missing_reservation() {
        let stack = test_stack();
        let err = stack.lifecycle.cancel(404, "alice", false).unwrap_err();
        assert_eq!(err.code, ErrorCode::ReservationNotFound);
    }

    #[test]
    fn test_complete_marks_served() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);
        let reservation = book(&stack, meal.id, "alice").unwrap();

        let completed = stack.lifecycle.complete(reservation.id).unwrap();
        assert_eq!(completed.status, ReservationStatus::Completed);

        // Terminal: neither completable nor cancellable again
        assert_eq!(
            stack.lifecycle.complete(reservation.id).unwrap_err().code,
            ErrorCode::AlreadyTerminal
        );
        assert_eq!(
            stack
                .lifecycle
                .cancel(reservation.id, "alice", false)
                .unwrap_err()
                .code,
            ErrorCode::AlreadyTerminal
        );

        // A served meal still blocks rebooking the same meal
        assert_eq!(
            book(&stack, meal.id, "alice").unwrap_err().code,
            ErrorCode::DuplicateReservation
        );
    }

    #[test]
    fn test_pending_transitions() {
        let stack = test_stack();
        let meal = make_meal(&stack.catalog, 5);

        // Pending records come from older data, not the booking path
        let pending = Reservation {
            id: 777,
            meal_id: meal.id,
            user_id: "carol".to_string(),
            username: "carol".to_string(),
            status: ReservationStatus::Pending,
            special_requirements: None,
            created_at: test_now(),
            hold: Uuid::new_v4(),
        };
        stack.store.insert_reservation(&pending).unwrap();

        // Completing a pending reservation skips a state
        assert_eq!(
            stack.lifecycle.complete(777).unwrap_err().code,
            ErrorCode::InvalidTransition
        );

        let confirmed = stack.lifecycle.confirm(777).unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);

        // Confirm is single-shot
        assert_eq!(
            stack.lifecycle.confirm(777).unwrap_err().code,
            ErrorCode::InvalidTransition
        );

        assert!(stack.lifecycle.complete(777).is_ok());
    }

    #[test]
    fn test_listings() {
        let stack = test_stack();
        let lunch = make_meal(&stack.catalog, 5);
        let dinner = stack
            .catalog
            .create(
                MealCreate {
                    name: "Minestrone".to_string(),
                    description: String::new(),
                    date: date(2026, 9, 2),
                    period: MealPeriod::Dinner,
                    capacity: 5,
                    vegetarian: true,
                    price: Decimal::new(400, 2),
                    deadline: time::date_hms_to_millis(date(2026, 9, 2), 17, 0, 0, TZ),
                },
                test_now(),
            )
            .unwrap();

        book(&stack, lunch.id, "alice").unwrap();
        book(&stack, dinner.id, "alice").unwrap();
        book(&stack, lunch.id, "bob").unwrap();

        // Roster is newest first and carries the meal summary
        let roster = stack.lifecycle.list_for_meal(lunch.id).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].user_id, "bob");
        assert_eq!(roster[1].user_id, "alice");
        assert_eq!(roster[0].meal.id, lunch.id);
        assert_eq!(stack.lifecycle.list_for_meal(dinner.id).unwrap().len(), 1);
        assert_eq!(
            stack.lifecycle.list_for_meal(404).unwrap_err().code,
            ErrorCode::MealNotFound
        );

        // Upcoming: only meals on or after the given day, active only,
        // ordered by service date
        let upcoming = stack
            .lifecycle
            .list_for_user_upcoming("alice", date(2026, 9, 2))
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].meal.id, dinner.id);

        let all_upcoming = stack
            .lifecycle
            .list_for_user_upcoming("alice", date(2026, 9, 1))
            .unwrap();
        assert_eq!(all_upcoming.len(), 2);
        assert_eq!(all_upcoming[0].meal.id, lunch.id);
        assert_eq!(all_upcoming[1].meal.id, dinner.id);

        let lunch_booking = &all_upcoming[0];
        stack
            .lifecycle
            .cancel(lunch_booking.id, "alice", false)
            .unwrap();
        let after_cancel = stack
            .lifecycle
            .list_for_user_upcoming("alice", date(2026, 9, 1))
            .unwrap();
        assert_eq!(after_cancel.len(), 1);

        // Full history keeps the cancelled one
        assert_eq!(stack.store.reservations_for_user("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_restore_rebuilds_ledger_and_pairs() {
        let store = CanteenStore::open_in_memory().unwrap();
        let ledger = Arc::new(ReservationLedger::new());
        let catalog = MealCatalog::new(store.clone(), ledger.clone(), TZ);
        let lifecycle = ReservationLifecycle::new(store.clone(), ledger);

        let meal = make_meal(&catalog, 3);
        let alice = lifecycle
            .create(meal.id, "alice", "alice", ReservationCreate::default(), test_now())
            .unwrap();
        let bob = lifecycle
            .create(meal.id, "bob", "bob", ReservationCreate::default(), test_now())
            .unwrap();
        lifecycle.cancel(bob.id, "bob", false).unwrap();

        // Fresh in-memory state over the same database file
        let fresh_ledger = Arc::new(ReservationLedger::new());
        let rebuilt_catalog = MealCatalog::new(store.clone(), fresh_ledger.clone(), TZ);
        let rebuilt = ReservationLifecycle::new(store, fresh_ledger.clone());

        rebuilt_catalog.restore().unwrap();
        let restored = rebuilt.restore().unwrap();
        assert_eq!(restored, 1);
        assert_eq!(fresh_ledger.snapshot(meal.id).unwrap().reserved, 1);

        // Alice is still guarded against double-booking
        let err = rebuilt
            .create(meal.id, "alice", "alice", ReservationCreate::default(), test_now())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateReservation);

        // Bob cancelled before the restart, so he can book again
        assert!(
            rebuilt
                .create(meal.id, "bob", "bob", ReservationCreate::default(), test_now())
                .is_ok()
        );

        // And Alice can still cancel her replayed reservation
        let cancelled = rebuilt.cancel(alice.id, "alice", false).unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(fresh_ledger.snapshot(meal.id).unwrap().reserved, 1);
    }
}
