//! Meal catalogue
//!
//! Owns meal records and their calendar rules, and keeps the admission
//! ledger in step with every edit. All admin mutations run inside a
//! single redb write transaction; since redb allows one writer at a
//! time, concurrent admin edits serialize on that lock and the ledger
//! propagation between `begin_write` and `commit` observes the same
//! order.

use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::{AppError, AppResult, ErrorCode};
use std::sync::Arc;
use tracing::warn;

use super::availability::{self, MealWithAvailability};
use super::ledger::ReservationLedger;
use super::storage::{CanteenStore, StorageResult};
use super::types::{Meal, MealCreate, MealFilter, MealUpdate};
use crate::utils::time;

pub struct MealCatalog {
    store: CanteenStore,
    ledger: Arc<ReservationLedger>,
    tz: Tz,
}

impl MealCatalog {
    pub fn new(store: CanteenStore, ledger: Arc<ReservationLedger>, tz: Tz) -> Self {
        Self { store, ledger, tz }
    }

    /// Create a meal and register it for admission
    pub fn create(&self, req: MealCreate, now: i64) -> AppResult<Meal> {
        if req.capacity == 0 {
            return Err(AppError::validation("Capacity must be at least 1"));
        }
        if req.price < rust_decimal::Decimal::ZERO {
            return Err(AppError::validation("Price cannot be negative"));
        }
        if req.date < time::date_at(now, self.tz) {
            return Err(AppError::new(ErrorCode::InvalidMealDate));
        }
        if req.deadline <= now {
            return Err(AppError::with_message(
                ErrorCode::InvalidDeadline,
                "Deadline must be in the future",
            ));
        }
        if req.deadline >= time::service_start_millis(req.date, req.period, self.tz) {
            return Err(AppError::with_message(
                ErrorCode::InvalidDeadline,
                "Deadline must fall before service start",
            ));
        }

        let meal = Meal {
            id: shared::util::snowflake_id(),
            name: req.name,
            description: req.description,
            date: req.date,
            period: req.period,
            capacity: req.capacity,
            vegetarian: req.vegetarian,
            price: req.price,
            deadline: req.deadline,
            enabled: true,
            created_at: now,
        };

        // Persist before registering: a meal that is admittable must
        // already be durable, while the reverse gap heals on restart.
        self.store.insert_meal(&meal)?;
        self.ledger.register(meal.id, meal.capacity, meal.deadline);
        Ok(meal)
    }

    /// Apply a partial update to a meal
    ///
    /// Capacity and deadline changes propagate to the ledger; moving the
    /// meal to another date or period is refused while reservations
    /// exist.
    pub fn update(&self, meal_id: i64, req: MealUpdate, now: i64) -> AppResult<Meal> {
        let txn = self.store.begin_write()?;
        let Some(current) = self.store.get_meal_txn(&txn, meal_id)? else {
            return Err(AppError::new(ErrorCode::MealNotFound));
        };

        let updated = apply_update(&current, &req);

        if updated.capacity == 0 {
            return Err(AppError::validation("Capacity must be at least 1"));
        }
        if updated.price < rust_decimal::Decimal::ZERO {
            return Err(AppError::validation("Price cannot be negative"));
        }

        let moved = updated.date != current.date || updated.period != current.period;
        if moved && updated.date < time::date_at(now, self.tz) {
            return Err(AppError::new(ErrorCode::InvalidMealDate));
        }
        if req.deadline.is_some() && updated.deadline <= now {
            return Err(AppError::with_message(
                ErrorCode::InvalidDeadline,
                "Deadline must be in the future",
            ));
        }
        if (moved || req.deadline.is_some())
            && updated.deadline >= time::service_start_millis(updated.date, updated.period, self.tz)
        {
            return Err(AppError::with_message(
                ErrorCode::InvalidDeadline,
                "Deadline must fall before service start",
            ));
        }

        if moved {
            // A booking admitted in this instant still references the
            // meal id and stays valid for the moved meal.
            let reserved = self
                .ledger
                .snapshot(meal_id)
                .map(|snap| snap.reserved)
                .unwrap_or(0);
            if reserved > 0 {
                return Err(
                    AppError::new(ErrorCode::MealHasReservations).with_detail("reserved", reserved)
                );
            }
        }

        // Ledger first: a capacity below the live hold count must abort
        // before anything is persisted.
        if updated.capacity != current.capacity {
            self.ledger.set_capacity(meal_id, updated.capacity)?;
        }
        if updated.deadline != current.deadline {
            self.ledger.set_deadline(meal_id, updated.deadline)?;
        }

        if let Err(err) = self.persist_meal(txn, &updated) {
            self.unwind_ledger(&current, &updated);
            return Err(err.into());
        }
        Ok(updated)
    }

    /// Take a meal off the menu; existing reservations stay valid
    pub fn disable(&self, meal_id: i64) -> AppResult<Meal> {
        let txn = self.store.begin_write()?;
        let Some(mut meal) = self.store.get_meal_txn(&txn, meal_id)? else {
            return Err(AppError::new(ErrorCode::MealNotFound));
        };

        if meal.enabled {
            meal.enabled = false;
            self.store.put_meal(&txn, &meal)?;
            txn.commit().map_err(super::storage::StorageError::Commit)?;
        }
        Ok(meal)
    }

    /// Meal detail joined with its live availability
    pub fn get(&self, meal_id: i64, now: i64) -> AppResult<MealWithAvailability> {
        let meal = self
            .store
            .get_meal(meal_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MealNotFound))?;
        availability::join(meal, &self.ledger, now)
    }

    /// All meals, admin view (disabled and past meals included)
    pub fn list_all(&self, now: i64) -> AppResult<Vec<MealWithAvailability>> {
        let mut meals = self.store.list_meals()?;
        sort_menu(&mut meals);
        availability::join_all(meals, &self.ledger, now)
    }

    /// Enabled meals matching a filter, from today onwards by default
    ///
    /// Full meals stay in the list with `available = false`, so students
    /// can see that a meal exists but has no seats left.
    pub fn list_available(
        &self,
        filter: &MealFilter,
        now: i64,
    ) -> AppResult<Vec<MealWithAvailability>> {
        let from = filter
            .date_from
            .unwrap_or_else(|| time::date_at(now, self.tz));

        let mut meals: Vec<Meal> = self
            .store
            .list_meals()?
            .into_iter()
            .filter(|meal| meal.enabled)
            .filter(|meal| meal.date >= from)
            .filter(|meal| filter.date_to.is_none_or(|to| meal.date <= to))
            .filter(|meal| filter.period.is_none_or(|period| meal.period == period))
            .filter(|meal| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|query| matches_search(meal, query))
            })
            .collect();

        sort_menu(&mut meals);
        availability::join_all(meals, &self.ledger, now)
    }

    /// Register every stored meal with the ledger (startup replay)
    pub fn restore(&self) -> AppResult<usize> {
        let meals = self.store.list_meals()?;
        for meal in &meals {
            self.ledger.register(meal.id, meal.capacity, meal.deadline);
        }
        Ok(meals.len())
    }

    fn persist_meal(&self, txn: WriteTransaction, meal: &Meal) -> StorageResult<()> {
        self.store.put_meal(&txn, meal)?;
        txn.commit()?;
        Ok(())
    }

    /// Put the ledger back after a failed persist so admission keeps
    /// following the stored record.
    fn unwind_ledger(&self, current: &Meal, updated: &Meal) {
        if updated.capacity != current.capacity
            && self
                .ledger
                .set_capacity(current.id, current.capacity)
                .is_err()
        {
            warn!(meal_id = current.id, "capacity rollback failed after storage error");
        }
        if updated.deadline != current.deadline {
            let _ = self.ledger.set_deadline(current.id, current.deadline);
        }
    }
}

fn apply_update(current: &Meal, req: &MealUpdate) -> Meal {
    let mut meal = current.clone();
    if let Some(name) = &req.name {
        meal.name = name.clone();
    }
    if let Some(description) = &req.description {
        meal.description = description.clone();
    }
    if let Some(date) = req.date {
        meal.date = date;
    }
    if let Some(period) = req.period {
        meal.period = period;
    }
    if let Some(capacity) = req.capacity {
        meal.capacity = capacity;
    }
    if let Some(vegetarian) = req.vegetarian {
        meal.vegetarian = vegetarian;
    }
    if let Some(price) = req.price {
        meal.price = price;
    }
    if let Some(deadline) = req.deadline {
        meal.deadline = deadline;
    }
    if let Some(enabled) = req.enabled {
        meal.enabled = enabled;
    }
    meal
}

fn sort_menu(meals: &mut [Meal]) {
    meals.sort_by_key(|meal| (meal.date, meal.period, meal.id));
}

fn matches_search(meal: &Meal, query: &str) -> bool {
    let query = query.to_lowercase();
    meal.name.to_lowercase().contains(&query)
        || meal.description.to_lowercase().contains(&query)
}
