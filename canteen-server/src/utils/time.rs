//! Calendar and timezone helpers
//!
//! All persisted instants are epoch milliseconds (UTC). Meal dates and
//! service times are canteen-local wall clock, so converting between the
//! two always goes through the configured timezone.

use chrono::{Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::canteen::types::MealPeriod;

/// Epoch millis for a local wall-clock time in `tz`
///
/// A wall-clock time skipped by a DST jump resolves to the equivalent
/// time one hour later; an ambiguous time (clocks rolled back) resolves
/// to the earlier instant.
pub fn date_hms_to_millis(date: NaiveDate, hour: u32, min: u32, sec: u32, tz: Tz) -> i64 {
    let naive = date
        .and_hms_opt(hour, min, sec)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
    }
}

/// Instant at which service starts for a meal, in epoch millis
///
/// Reservation deadlines must fall strictly before this.
pub fn service_start_millis(date: NaiveDate, period: MealPeriod, tz: Tz) -> i64 {
    let (hour, min, sec) = period.service_start_hms();
    date_hms_to_millis(date, hour, min, sec, tz)
}

/// Date on the canteen's wall clock at the given instant
pub fn date_at(millis: i64, tz: Tz) -> NaiveDate {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
        .with_timezone(&tz)
        .date_naive()
}

/// Today's date on the canteen's wall clock
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summer_day() -> NaiveDate {
        // Mid-July: no DST transition anywhere near the service window
        NaiveDate::from_ymd_opt(2026, 7, 15).unwrap()
    }

    #[test]
    fn test_period_starts_are_ordered_within_a_day() {
        let tz = chrono_tz::Europe::Rome;
        let date = summer_day();

        let breakfast = service_start_millis(date, MealPeriod::Breakfast, tz);
        let lunch = service_start_millis(date, MealPeriod::Lunch, tz);
        let dinner = service_start_millis(date, MealPeriod::Dinner, tz);

        // 07:30 -> 12:30 is five hours, 12:30 -> 19:00 is six and a half
        assert_eq!(lunch - breakfast, 5 * 3_600_000);
        assert_eq!(dinner - lunch, 6 * 3_600_000 + 1_800_000);
    }

    #[test]
    fn test_next_day_is_24h_later_outside_dst() {
        let tz = chrono_tz::Europe::Rome;
        let date = summer_day();
        let next = date.succ_opt().unwrap();

        let today_lunch = service_start_millis(date, MealPeriod::Lunch, tz);
        let tomorrow_lunch = service_start_millis(next, MealPeriod::Lunch, tz);
        assert_eq!(tomorrow_lunch - today_lunch, 24 * 3_600_000);
    }

    #[test]
    fn test_timezone_offset_is_applied() {
        let date = summer_day();

        // 12:30 CEST is 10:30 UTC, so the Rome instant is two hours earlier
        let rome = date_hms_to_millis(date, 12, 30, 0, chrono_tz::Europe::Rome);
        let utc = date_hms_to_millis(date, 12, 30, 0, chrono_tz::UTC);
        assert_eq!(utc - rome, 2 * 3_600_000);
    }

    #[test]
    fn test_dst_gap_resolves_forward() {
        // Europe/Rome springs forward 2026-03-29 02:00 -> 03:00;
        // 02:30 does not exist on that wall clock
        let tz = chrono_tz::Europe::Rome;
        let date = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();

        let before_gap = date_hms_to_millis(date, 1, 59, 0, tz);
        let in_gap = date_hms_to_millis(date, 2, 30, 0, tz);
        let after_gap = date_hms_to_millis(date, 4, 0, 0, tz);

        assert!(in_gap > before_gap);
        assert!(in_gap < after_gap);
    }

    #[test]
    fn test_date_at_follows_the_wall_clock() {
        let date = summer_day();

        // 00:30 in Rome is still the previous day in UTC
        let after_midnight = date_hms_to_millis(date, 0, 30, 0, chrono_tz::Europe::Rome);
        assert_eq!(date_at(after_midnight, chrono_tz::Europe::Rome), date);
        assert_eq!(
            date_at(after_midnight, chrono_tz::UTC),
            date.pred_opt().unwrap()
        );
    }

    #[test]
    fn test_dst_ambiguity_resolves_to_earlier_instant() {
        // Europe/Rome falls back 2026-10-25 03:00 -> 02:00;
        // 02:30 happens twice
        let tz = chrono_tz::Europe::Rome;
        let date = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();

        let ambiguous = date_hms_to_millis(date, 2, 30, 0, tz);
        let before = date_hms_to_millis(date, 1, 30, 0, tz);

        // Earlier occurrence: exactly one hour after 01:30 CEST
        assert_eq!(ambiguous - before, 3_600_000);
    }
}
