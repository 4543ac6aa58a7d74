//! Result extractor (spec §4.E): turns a solved `MonthlySchedule` into the
//! planning table consumed by the reporter (and, externally, by whatever
//! presentation layer the caller wires up).

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::catalog::Catalog;
use crate::domain::MonthlySchedule;

pub const LABEL_HOLIDAY: &str = "HOLIDAY";
pub const LABEL_FIXED_OFF: &str = "FIXED_OFF";
pub const LABEL_OFF: &str = "OFF";
pub const LABEL_ERR_NO_SHIFT: &str = "ERR_NO_SHIFT";

/// Rows are employee names, columns are ISO date strings, cells are shift
/// ids or one of `{OFF, HOLIDAY, FIXED_OFF, ERR_NO_SHIFT}` (spec §6).
pub type PlanningTable = BTreeMap<String, BTreeMap<String, String>>;

/// Labels a single `(employee, date)` cell, following spec §4.E's
/// precedence: an explicit `HOLIDAY` constraint beats `FIXED_OFF`, which
/// beats a bare `OFF` (off for some other reason — there is none in this
/// model, since every `is_off` day traces back to one of the two, but the
/// fallback mirrors the original precedence chain exactly).
fn label_cell(schedule: &MonthlySchedule, employee_idx: usize, date: NaiveDate, shift_idx: Option<usize>) -> String {
    let employee = schedule.employee(employee_idx);
    match shift_idx {
        Some(idx) => schedule.shifts[idx].id.clone(),
        None => {
            if employee.holiday_dates.contains(&date) {
                LABEL_HOLIDAY.to_string()
            } else if employee.fixed_off_weekdays.contains(&crate::domain::weekday_index(date)) {
                LABEL_FIXED_OFF.to_string()
            } else {
                LABEL_OFF.to_string()
            }
        }
    }
}

/// Builds the planning table from a solved schedule. `ERR_NO_SHIFT` is
/// reserved for a defect in the solver or search driver — every
/// `DayAssignment` in a correctly built `MonthlySchedule` has exactly one
/// cell, so this path is unreachable in practice but kept for parity with
/// the original extractor's defensive fallback.
pub fn extract_plan(schedule: &MonthlySchedule, catalog: &Catalog) -> PlanningTable {
    let _ = catalog;
    let mut table: PlanningTable = BTreeMap::new();

    for assignment in &schedule.assignments {
        let employee = schedule.employee(assignment.employee_idx);
        let row = table.entry(employee.name.clone()).or_default();
        let label = label_cell(schedule, assignment.employee_idx, assignment.date, assignment.shift_idx);
        row.insert(assignment.date.to_string(), label);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ConstraintInput, EmployeeInput, NeedInput, ShiftsCatalogEntry};
    use crate::domain::{build_schedule, DayAssignment};
    use chrono::Datelike;
    use std::collections::{HashMap, HashSet};

    fn single_employee_catalog(constraints: Vec<ConstraintInput>) -> Catalog {
        let mut shifts = HashMap::new();
        shifts.insert("A".to_string(), ShiftsCatalogEntry { start_time: "08:00".to_string(), end_time: "16:00".to_string() });
        let employees = vec![EmployeeInput { id: "e1".to_string(), name: "Alice".to_string(), function_ids: vec![], constraints }];
        let needs = vec![NeedInput { date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), shift_id: "A".to_string(), count: 1 }];
        Catalog::build(&shifts, &[], &employees, &needs, &HashMap::new()).unwrap().0
    }

    #[test]
    fn holiday_beats_fixed_off_in_the_label_precedence() {
        let catalog = single_employee_catalog(vec![
            ConstraintInput::Holiday { date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() },
            ConstraintInput::FixedOff { weekday: "MONDAY".to_string() },
        ]);
        let config = crate::config::Config {
            min_rest_hours: 11,
            solver_time_limit_seconds: 1,
            min_off_days_per_month: 8,
            max_consecutive_work_days: 6,
            group_min_off_days: HashMap::new(),
            specific_agent_rules: vec![],
            penalties: crate::config::Penalties::default(),
        };
        let mut schedule = build_schedule(&catalog, &HashSet::new(), &[], &config);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date.weekday(), chrono::Weekday::Mon);
        schedule.assignments = vec![DayAssignment { id: "e1:2024-01-01".into(), employee_idx: 0, date, shift_idx: None }];

        let table = extract_plan(&schedule, &catalog);
        assert_eq!(table["Alice"]["2024-01-01"], LABEL_HOLIDAY);
    }

    #[test]
    fn assigned_shift_takes_precedence_over_any_off_label() {
        let catalog = single_employee_catalog(vec![]);
        let config = crate::config::Config {
            min_rest_hours: 11,
            solver_time_limit_seconds: 1,
            min_off_days_per_month: 8,
            max_consecutive_work_days: 6,
            group_min_off_days: HashMap::new(),
            specific_agent_rules: vec![],
            penalties: crate::config::Penalties::default(),
        };
        let mut schedule = build_schedule(&catalog, &HashSet::new(), &[], &config);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        schedule.assignments = vec![DayAssignment { id: "e1:2024-01-01".into(), employee_idx: 0, date, shift_idx: Some(0) }];

        let table = extract_plan(&schedule, &catalog);
        assert_eq!(table["Alice"]["2024-01-01"], "A");
    }
}
