//! Derived-constraint precomputer (spec §4.B), ported from the original
//! `calculate_toxic_pairs` / `get_weekends_in_range` helpers.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::info;

use crate::catalog::{Shift, ShiftId, MINUTES_IN_DAY};

/// `(s1, s2)` is forbidden iff assigning `s1` on day `D` and `s2` on day
/// `D+1` leaves less than `min_rest_hours` of rest. The relation is not
/// symmetric: `(s1, s2)` forbidden does not imply `(s2, s1)` is forbidden.
pub fn forbidden_transitions(
    shifts: &BTreeMap<ShiftId, Shift>,
    min_rest_hours: i64,
) -> HashSet<(ShiftId, ShiftId)> {
    let min_rest_minutes = min_rest_hours * 60;
    let mut forbidden = HashSet::new();

    for s1 in shifts.values() {
        for s2 in shifts.values() {
            let rest_until_midnight = MINUTES_IN_DAY - s1.end_minutes;
            let rest_after_midnight = s2.start_minutes;
            let total_rest = rest_until_midnight + rest_after_midnight;
            if total_rest < min_rest_minutes {
                forbidden.insert((s1.id.clone(), s2.id.clone()));
            }
        }
    }

    info!(count = forbidden.len(), "computed forbidden shift transitions");
    forbidden
}

/// Every `(Saturday, Sunday)` pair both present in `horizon` (spec §4.B).
pub fn weekend_pairs(horizon: &[NaiveDate]) -> Vec<(NaiveDate, NaiveDate)> {
    let present: HashSet<NaiveDate> = horizon.iter().copied().collect();
    let mut pairs = Vec::new();
    for &day in horizon {
        if day.weekday() == Weekday::Sat {
            let sunday = day.succ_opt().expect("date within representable range");
            if present.contains(&sunday) {
                pairs.push((day, sunday));
            }
        }
    }
    info!(count = pairs.len(), "found weekend pairs in horizon");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Shift, ShiftId};

    fn shift(id: &str, start: i64, end: i64) -> (ShiftId, Shift) {
        let duration = (end - start).rem_euclid(MINUTES_IN_DAY);
        (id.to_string(), Shift { id: id.to_string(), start_minutes: start, end_minutes: end, duration_minutes: duration })
    }

    #[test]
    fn short_rest_between_overnight_and_early_is_forbidden() {
        let mut shifts = BTreeMap::new();
        let (id, s) = shift("LATE", 20 * 60, 4 * 60);
        shifts.insert(id, s);
        let (id, s) = shift("EARLY", 6 * 60, 14 * 60);
        shifts.insert(id, s);

        let forbidden = forbidden_transitions(&shifts, 11);
        assert!(forbidden.contains(&("LATE".to_string(), "EARLY".to_string())));
    }

    #[test]
    fn forbidden_is_directional() {
        let mut shifts = BTreeMap::new();
        let (id, s) = shift("MORNING", 6 * 60, 14 * 60);
        shifts.insert(id, s);
        let (id, s) = shift("EVENING", 14 * 60, 22 * 60);
        shifts.insert(id, s);

        let forbidden = forbidden_transitions(&shifts, 11);
        // MORNING end (14:00) -> EVENING start (14:00) next day: rest = 10h + 14h = way over.
        assert!(!forbidden.contains(&("MORNING".to_string(), "EVENING".to_string())));
    }

    #[test]
    fn weekend_pairs_require_both_days_present() {
        let sat = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let sun = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let horizon = vec![sat, sun];
        assert_eq!(weekend_pairs(&horizon), vec![(sat, sun)]);
    }

    #[test]
    fn weekend_pair_dropped_if_sunday_outside_horizon() {
        let sat = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let horizon = vec![sat];
        assert!(weekend_pairs(&horizon).is_empty());
    }
}
