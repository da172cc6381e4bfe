//! Availability projection
//!
//! Pure read-side derivation of "can this meal still be booked" from a
//! meal record plus a ledger snapshot. Nothing here takes a lock or
//! touches storage; handlers grab a snapshot and project it.

use serde::{Deserialize, Serialize};
use shared::{AppError, AppResult};

use super::ledger::{LedgerSnapshot, ReservationLedger};
use super::types::Meal;

/// Derived availability for one meal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityView {
    pub reserved: u32,
    pub remaining: u32,
    pub available: bool,
}

/// Derive availability from a meal and its ledger snapshot
///
/// `available` means a booking attempt at `now` could be admitted: the
/// meal is enabled, the deadline has not been reached and at least one
/// seat is free. The snapshot's deadline governs, since that is the one
/// admission actually checks.
pub fn project(meal: &Meal, snapshot: &LedgerSnapshot, now: i64) -> AvailabilityView {
    let remaining = snapshot.capacity.saturating_sub(snapshot.reserved);
    AvailabilityView {
        reserved: snapshot.reserved,
        remaining,
        available: meal.enabled && now < snapshot.deadline && remaining > 0,
    }
}

/// Meal record joined with its projected availability (the listing shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealWithAvailability {
    #[serde(flatten)]
    pub meal: Meal,
    #[serde(flatten)]
    pub availability: AvailabilityView,
}

/// Join one meal with its ledger snapshot
///
/// Every catalogued meal is registered with the ledger when it is
/// created and again during startup replay, so a missing snapshot is an
/// internal fault rather than a client error.
pub fn join(meal: Meal, ledger: &ReservationLedger, now: i64) -> AppResult<MealWithAvailability> {
    let snapshot = ledger
        .snapshot(meal.id)
        .ok_or_else(|| AppError::internal(format!("meal {} missing from ledger", meal.id)))?;
    let availability = project(&meal, &snapshot, now);
    Ok(MealWithAvailability { meal, availability })
}

/// Join a batch of meals with their ledger snapshots
pub fn join_all(
    meals: Vec<Meal>,
    ledger: &ReservationLedger,
    now: i64,
) -> AppResult<Vec<MealWithAvailability>> {
    meals
        .into_iter()
        .map(|meal| join(meal, ledger, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canteen::types::MealPeriod;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    const DEADLINE: i64 = 1_000_000;
    const NOW: i64 = 500_000;

    fn test_meal(capacity: u32, enabled: bool) -> Meal {
        Meal {
            id: 1,
            name: "Lasagne".to_string(),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            period: MealPeriod::Lunch,
            capacity,
            vegetarian: false,
            price: Decimal::new(550, 2),
            deadline: DEADLINE,
            enabled,
            created_at: 0,
        }
    }

    fn snapshot(capacity: u32, reserved: u32) -> LedgerSnapshot {
        LedgerSnapshot {
            capacity,
            reserved,
            deadline: DEADLINE,
        }
    }

    #[test]
    fn test_project_open_meal() {
        let view = project(&test_meal(10, true), &snapshot(10, 3), NOW);
        assert_eq!(view.reserved, 3);
        assert_eq!(view.remaining, 7);
        assert!(view.available);
    }

    #[test]
    fn test_project_full_meal() {
        let view = project(&test_meal(10, true), &snapshot(10, 10), NOW);
        assert_eq!(view.remaining, 0);
        assert!(!view.available);
    }

    #[test]
    fn test_project_disabled_meal() {
        let view = project(&test_meal(10, false), &snapshot(10, 0), NOW);
        assert_eq!(view.remaining, 10);
        assert!(!view.available);
    }

    #[test]
    fn test_project_deadline_boundary() {
        let meal = test_meal(10, true);
        let snap = snapshot(10, 0);

        assert!(project(&meal, &snap, DEADLINE - 1).available);
        // Matches admission: the deadline instant itself is closed
        assert!(!project(&meal, &snap, DEADLINE).available);
        assert!(!project(&meal, &snap, DEADLINE + 1).available);
    }

    #[test]
    fn test_project_never_underflows() {
        // Snapshot taken moments before a capacity edit can disagree
        // with the meal record; remaining must not wrap
        let view = project(&test_meal(2, true), &snapshot(2, 5), NOW);
        assert_eq!(view.remaining, 0);
        assert!(!view.available);
    }

    #[test]
    fn test_join_uses_ledger_state() {
        let ledger = ReservationLedger::new();
        ledger.register(1, 5, DEADLINE);
        ledger.try_reserve(1, NOW).unwrap();
        ledger.try_reserve(1, NOW).unwrap();

        let joined = join(test_meal(5, true), &ledger, NOW).unwrap();
        assert_eq!(joined.availability.reserved, 2);
        assert_eq!(joined.availability.remaining, 3);
        assert!(joined.availability.available);
    }

    #[test]
    fn test_join_unregistered_meal_is_internal_fault() {
        let ledger = ReservationLedger::new();
        let result = join(test_meal(5, true), &ledger, NOW);
        assert!(result.is_err());
    }

    #[test]
    fn test_flattened_wire_shape() {
        let ledger = ReservationLedger::new();
        ledger.register(1, 5, DEADLINE);

        let joined = join(test_meal(5, true), &ledger, NOW).unwrap();
        let json = serde_json::to_value(&joined).unwrap();

        // Meal fields and availability fields share one flat object
        assert_eq!(json["name"], "Lasagne");
        assert_eq!(json["capacity"], 5);
        assert_eq!(json["reserved"], 0);
        assert_eq!(json["remaining"], 5);
        assert_eq!(json["available"], true);
    }
}
