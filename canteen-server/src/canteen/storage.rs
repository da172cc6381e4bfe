//! redb-based storage layer for meals and reservations
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `meals` | `meal_id` | `Meal` | Meal catalogue |
//! | `reservations` | `reservation_id` | `Reservation` | Reservation records |
//! | `meal_reservations` | `(meal_id, reservation_id)` | `()` | Per-meal index |
//! | `user_reservations` | `(user_id, reservation_id)` | `()` | Per-user index |
//!
//! Records are stored as JSON; the index tables carry no payload and exist
//! only for range scans.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns the
//! record survives power loss, and the file is always left in a consistent
//! state (copy-on-write with atomic pointer swap). A reservation is only
//! acknowledged to the client after its record has committed, so a restart
//! can rebuild the in-memory ledger from this file without overselling.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::AppError;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::types::{Meal, Reservation};

/// Table for meals: key = meal_id, value = JSON-serialized Meal
const MEALS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("meals");

/// Table for reservations: key = reservation_id, value = JSON-serialized Reservation
const RESERVATIONS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("reservations");

/// Per-meal index: key = (meal_id, reservation_id), value = empty
const MEAL_RESERVATIONS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("meal_reservations");

/// Per-user index: key = (user_id, reservation_id), value = empty
const USER_RESERVATIONS_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("user_reservations");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::database(err.to_string())
    }
}

/// Canteen storage backed by redb
#[derive(Clone)]
pub struct CanteenStore {
    db: Arc<Database>,
}

impl CanteenStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;

        // Create all tables up front so later read transactions never
        // hit a missing table.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MEALS_TABLE)?;
            let _ = write_txn.open_table(RESERVATIONS_TABLE)?;
            let _ = write_txn.open_table(MEAL_RESERVATIONS_TABLE)?;
            let _ = write_txn.open_table(USER_RESERVATIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MEALS_TABLE)?;
            let _ = write_txn.open_table(RESERVATIONS_TABLE)?;
            let _ = write_txn.open_table(MEAL_RESERVATIONS_TABLE)?;
            let _ = write_txn.open_table(USER_RESERVATIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Meal Operations ==========

    /// Store a meal (insert or overwrite), committing immediately
    pub fn insert_meal(&self, meal: &Meal) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.put_meal(&txn, meal)?;
        txn.commit()?;
        Ok(())
    }

    /// Store a meal within an existing transaction
    pub fn put_meal(&self, txn: &WriteTransaction, meal: &Meal) -> StorageResult<()> {
        let mut table = txn.open_table(MEALS_TABLE)?;
        let value = serde_json::to_vec(meal)?;
        table.insert(meal.id, value.as_slice())?;
        Ok(())
    }

    /// Get a meal by id
    pub fn get_meal(&self, meal_id: i64) -> StorageResult<Option<Meal>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEALS_TABLE)?;

        match table.get(meal_id)? {
            Some(value) => {
                let meal: Meal = serde_json::from_slice(value.value())?;
                Ok(Some(meal))
            }
            None => Ok(None),
        }
    }

    /// Get a meal by id (within transaction)
    pub fn get_meal_txn(
        &self,
        txn: &WriteTransaction,
        meal_id: i64,
    ) -> StorageResult<Option<Meal>> {
        let table = txn.open_table(MEALS_TABLE)?;

        match table.get(meal_id)? {
            Some(value) => {
                let meal: Meal = serde_json::from_slice(value.value())?;
                Ok(Some(meal))
            }
            None => Ok(None),
        }
    }

    /// Get all meals
    pub fn list_meals(&self) -> StorageResult<Vec<Meal>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEALS_TABLE)?;

        let mut meals = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let meal: Meal = serde_json::from_slice(value.value())?;
            meals.push(meal);
        }

        Ok(meals)
    }

    // ========== Reservation Operations ==========

    /// Store a reservation together with both index rows, committing
    /// immediately. Used on the booking path: the record and its indexes
    /// land in one transaction.
    pub fn insert_reservation(&self, reservation: &Reservation) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.put_reservation(&txn, reservation)?;
        self.link_reservation(&txn, reservation)?;
        txn.commit()?;
        Ok(())
    }

    /// Store a reservation record within an existing transaction
    /// (index rows untouched; used for status rewrites)
    pub fn put_reservation(
        &self,
        txn: &WriteTransaction,
        reservation: &Reservation,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(RESERVATIONS_TABLE)?;
        let value = serde_json::to_vec(reservation)?;
        table.insert(reservation.id, value.as_slice())?;
        Ok(())
    }

    /// Write both index rows for a reservation
    pub fn link_reservation(
        &self,
        txn: &WriteTransaction,
        reservation: &Reservation,
    ) -> StorageResult<()> {
        let mut meal_index = txn.open_table(MEAL_RESERVATIONS_TABLE)?;
        meal_index.insert((reservation.meal_id, reservation.id), ())?;

        let mut user_index = txn.open_table(USER_RESERVATIONS_TABLE)?;
        user_index.insert((reservation.user_id.as_str(), reservation.id), ())?;
        Ok(())
    }

    /// Get a reservation by id
    pub fn get_reservation(&self, reservation_id: i64) -> StorageResult<Option<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESERVATIONS_TABLE)?;

        match table.get(reservation_id)? {
            Some(value) => {
                let reservation: Reservation = serde_json::from_slice(value.value())?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    /// Get a reservation by id (within transaction)
    pub fn get_reservation_txn(
        &self,
        txn: &WriteTransaction,
        reservation_id: i64,
    ) -> StorageResult<Option<Reservation>> {
        let table = txn.open_table(RESERVATIONS_TABLE)?;

        match table.get(reservation_id)? {
            Some(value) => {
                let reservation: Reservation = serde_json::from_slice(value.value())?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    /// Get all reservations for a meal via the per-meal index
    pub fn reservations_for_meal(&self, meal_id: i64) -> StorageResult<Vec<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(MEAL_RESERVATIONS_TABLE)?;
        let records = read_txn.open_table(RESERVATIONS_TABLE)?;

        let range_start = (meal_id, 0i64);
        let range_end = (meal_id, i64::MAX);

        let mut reservations = Vec::new();
        for result in index.range(range_start..=range_end)? {
            let (key, _) = result?;
            let (_, reservation_id) = key.value();
            if let Some(value) = records.get(reservation_id)? {
                let reservation: Reservation = serde_json::from_slice(value.value())?;
                reservations.push(reservation);
            }
        }

        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }

    /// Get all reservations for a user via the per-user index
    pub fn reservations_for_user(&self, user_id: &str) -> StorageResult<Vec<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USER_RESERVATIONS_TABLE)?;
        let records = read_txn.open_table(RESERVATIONS_TABLE)?;

        let range_start = (user_id, 0i64);
        let range_end = (user_id, i64::MAX);

        let mut reservations = Vec::new();
        for result in index.range(range_start..=range_end)? {
            let (key, _) = result?;
            let (_, reservation_id) = key.value();
            if let Some(value) = records.get(reservation_id)? {
                let reservation: Reservation = serde_json::from_slice(value.value())?;
                reservations.push(reservation);
            }
        }

        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }

    /// Get all reservations (startup rebuild and admin listings)
    pub fn list_reservations(&self) -> StorageResult<Vec<Reservation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESERVATIONS_TABLE)?;

        let mut reservations = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let reservation: Reservation = serde_json::from_slice(value.value())?;
            reservations.push(reservation);
        }

        Ok(reservations)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let meals_table = read_txn.open_table(MEALS_TABLE)?;
        let reservations_table = read_txn.open_table(RESERVATIONS_TABLE)?;

        Ok(StorageStats {
            meal_count: meals_table.len()?,
            reservation_count: reservations_table.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub meal_count: u64,
    pub reservation_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canteen::types::{MealPeriod, ReservationStatus};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn create_test_meal(id: i64) -> Meal {
        Meal {
            id,
            name: format!("Meal {id}"),
            description: "Test meal".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            period: MealPeriod::Lunch,
            capacity: 50,
            vegetarian: false,
            price: Decimal::new(450, 2),
            deadline: shared::util::now_millis() + 86_400_000,
            enabled: true,
            created_at: shared::util::now_millis(),
        }
    }

    fn create_test_reservation(id: i64, meal_id: i64, user_id: &str) -> Reservation {
        Reservation {
            id,
            meal_id,
            user_id: user_id.to_string(),
            username: "test_user".to_string(),
            status: ReservationStatus::Confirmed,
            special_requirements: None,
            created_at: shared::util::now_millis(),
            hold: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_meal_roundtrip() {
        let store = CanteenStore::open_in_memory().unwrap();
        let meal = create_test_meal(1);

        store.insert_meal(&meal).unwrap();

        let retrieved = store.get_meal(1).unwrap();
        assert!(retrieved.is_some());
        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.name, "Meal 1");
        assert_eq!(retrieved.capacity, 50);
        assert_eq!(retrieved.price, Decimal::new(450, 2));
    }

    #[test]
    fn test_meal_overwrite() {
        let store = CanteenStore::open_in_memory().unwrap();
        let mut meal = create_test_meal(1);
        store.insert_meal(&meal).unwrap();

        meal.capacity = 80;
        meal.enabled = false;
        store.insert_meal(&meal).unwrap();

        let retrieved = store.get_meal(1).unwrap().unwrap();
        assert_eq!(retrieved.capacity, 80);
        assert!(!retrieved.enabled);

        // Overwrite, not append
        assert_eq!(store.list_meals().unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_meal() {
        let store = CanteenStore::open_in_memory().unwrap();
        assert!(store.get_meal(404).unwrap().is_none());
    }

    #[test]
    fn test_list_meals() {
        let store = CanteenStore::open_in_memory().unwrap();
        store.insert_meal(&create_test_meal(1)).unwrap();
        store.insert_meal(&create_test_meal(2)).unwrap();
        store.insert_meal(&create_test_meal(3)).unwrap();

        let meals = store.list_meals().unwrap();
        assert_eq!(meals.len(), 3);
    }

    #[test]
    fn test_reservation_roundtrip() {
        let store = CanteenStore::open_in_memory().unwrap();
        let reservation = create_test_reservation(100, 1, "user-1");

        store.insert_reservation(&reservation).unwrap();

        let retrieved = store.get_reservation(100).unwrap();
        assert!(retrieved.is_some());
        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.meal_id, 1);
        assert_eq!(retrieved.user_id, "user-1");
        assert_eq!(retrieved.status, ReservationStatus::Confirmed);
        assert_eq!(retrieved.hold, reservation.hold);
    }

    #[test]
    fn test_meal_index_scan() {
        let store = CanteenStore::open_in_memory().unwrap();

        store.insert_reservation(&create_test_reservation(1, 10, "a")).unwrap();
        store.insert_reservation(&create_test_reservation(2, 10, "b")).unwrap();
        store.insert_reservation(&create_test_reservation(3, 20, "a")).unwrap();

        let for_meal_10 = store.reservations_for_meal(10).unwrap();
        assert_eq!(for_meal_10.len(), 2);
        assert!(for_meal_10.iter().all(|r| r.meal_id == 10));

        let for_meal_20 = store.reservations_for_meal(20).unwrap();
        assert_eq!(for_meal_20.len(), 1);

        assert!(store.reservations_for_meal(30).unwrap().is_empty());
    }

    #[test]
    fn test_user_index_scan() {
        let store = CanteenStore::open_in_memory().unwrap();

        store.insert_reservation(&create_test_reservation(1, 10, "alice")).unwrap();
        store.insert_reservation(&create_test_reservation(2, 20, "alice")).unwrap();
        store.insert_reservation(&create_test_reservation(3, 10, "bob")).unwrap();

        let alice = store.reservations_for_user("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|r| r.user_id == "alice"));

        let bob = store.reservations_for_user("bob").unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].meal_id, 10);
    }

    #[test]
    fn test_status_rewrite_in_transaction() {
        let store = CanteenStore::open_in_memory().unwrap();
        let reservation = create_test_reservation(100, 1, "user-1");
        store.insert_reservation(&reservation).unwrap();

        // Check-and-set within one write transaction
        let txn = store.begin_write().unwrap();
        let mut current = store.get_reservation_txn(&txn, 100).unwrap().unwrap();
        assert_eq!(current.status, ReservationStatus::Confirmed);
        current.status = ReservationStatus::Cancelled;
        store.put_reservation(&txn, &current).unwrap();
        txn.commit().unwrap();

        let retrieved = store.get_reservation(100).unwrap().unwrap();
        assert_eq!(retrieved.status, ReservationStatus::Cancelled);

        // Index rows still resolve the record after the rewrite
        let for_meal = store.reservations_for_meal(1).unwrap();
        assert_eq!(for_meal.len(), 1);
        assert_eq!(for_meal[0].status, ReservationStatus::Cancelled);
    }

    #[test]
    fn test_stats() {
        let store = CanteenStore::open_in_memory().unwrap();
        store.insert_meal(&create_test_meal(1)).unwrap();
        store.insert_reservation(&create_test_reservation(1, 1, "a")).unwrap();
        store.insert_reservation(&create_test_reservation(2, 1, "b")).unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.meal_count, 1);
        assert_eq!(stats.reservation_count, 2);
    }
}
