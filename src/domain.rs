//! Planning model for Monthly Shift Scheduling (spec §4.C).
//!
//! One `DayAssignment` planning entity per `(employee, day)` in the horizon.
//! Its single planning variable, `shift_idx: Option<usize>`, collapses
//! spec.md's `assign[e,d,s] ∪ is_off[e,d]` boolean family into one
//! multi-valued choice: `Some(idx)` means "working shift `idx`", `None`
//! means "off". Hard rule #1 ("exactly one of is_off or some assign is
//! set") is therefore true by construction rather than an enforced
//! constraint — see DESIGN.md.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use solverforge::prelude::*;

use crate::catalog::Catalog;

/// Problem fact mirroring `catalog::Shift`, indexed for O(1) joins.
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningShift {
    pub index: usize,
    pub id: String,
    pub duration_minutes: i64,
    /// Function ids that list this shift as a qualification, used to
    /// attribute `shifts_per_function` aggregates.
    pub function_ids: HashSet<String>,
}

/// Problem fact mirroring `catalog::Employee`, with per-employee caps
/// denormalized so constraint closures need no further catalog lookups.
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningEmployee {
    pub index: usize,
    pub id: String,
    pub name: String,
    /// Function ids this employee actually holds (`catalog::Employee.functions`),
    /// as distinct from `qualified_shift_indices` (the union of those
    /// functions' shift qualifications). `shifts_per_function[e,f]` is only
    /// meaningful for `f` in this set.
    pub held_function_ids: HashSet<String>,
    pub qualified_shift_indices: HashSet<usize>,
    pub holiday_dates: HashSet<NaiveDate>,
    /// `0..=6`, Monday-based, to keep the fact plainly serializable.
    pub fixed_off_weekdays: HashSet<u8>,
    pub max_hours: Option<i64>,
    pub max_shifts_per_function: Vec<(String, i64)>,
    pub group_index: Option<usize>,
}

impl PlanningEmployee {
    pub fn is_off_on(&self, date: NaiveDate) -> bool {
        self.holiday_dates.contains(&date) || self.fixed_off_weekdays.contains(&weekday_index(date))
    }
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Problem fact: one row of `config.group_min_off_days` plus the group's
/// soft-rule S2 target, resolved once at model-build time.
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningGroup {
    pub index: usize,
    pub name: String,
    pub member_indices: Vec<usize>,
    /// Hard override from spec §4.C.1 rule 5, if `config.group_min_off_days`
    /// names this group with a positive value.
    pub hard_min_off_days: Option<i64>,
    /// Soft target from spec §4.C.2 S2 (falls back to the global default).
    pub soft_off_days_target: i64,
}

/// Problem fact: `(s1, s2)` forbidden transition (spec §4.B).
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbiddenTransition {
    pub from_shift_idx: usize,
    pub to_shift_idx: usize,
}

/// Problem fact: one `Need(date, shift_id, count)` row (spec §3).
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningNeed {
    pub date: NaiveDate,
    pub shift_idx: usize,
    pub count: i64,
}

/// Problem fact: one `(Saturday, Sunday)` pair inside the horizon.
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningWeekend {
    pub saturday: NaiveDate,
    pub sunday: NaiveDate,
}

/// Problem fact: a `config.specific_agent_rules` entry resolved to employee
/// indices (spec §4.C.1 rule 6).
#[problem_fact]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificAgentRuleFact {
    pub employee_indices: Vec<usize>,
    pub target_function: String,
    pub min_count: i64,
}

/// The decision variable: which shift (if any) employee `employee_idx`
/// works on `date`.
#[planning_entity]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAssignment {
    #[planning_id]
    pub id: String,
    pub employee_idx: usize,
    pub date: NaiveDate,
    #[planning_variable(allows_unassigned = true)]
    pub shift_idx: Option<usize>,
}

impl DayAssignment {
    pub fn is_off(&self) -> bool {
        self.shift_idx.is_none()
    }
}

#[planning_solution]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySchedule {
    #[problem_fact_collection]
    pub employees: Vec<PlanningEmployee>,
    #[problem_fact_collection]
    pub shifts: Vec<PlanningShift>,
    #[problem_fact_collection]
    pub groups: Vec<PlanningGroup>,
    #[problem_fact_collection]
    pub forbidden_transitions: Vec<ForbiddenTransition>,
    #[problem_fact_collection]
    pub needs: Vec<PlanningNeed>,
    #[problem_fact_collection]
    pub weekends: Vec<PlanningWeekend>,
    #[problem_fact_collection]
    pub specific_agent_rules: Vec<SpecificAgentRuleFact>,
    #[planning_entity_collection]
    pub assignments: Vec<DayAssignment>,
    #[planning_score]
    pub score: Option<HardSoftDecimalScore>,
    #[serde(rename = "solverStatus", skip_serializing_if = "Option::is_none")]
    pub solver_status: Option<String>,
}

impl MonthlySchedule {
    pub fn shift_index(&self, shift_id: &str) -> Option<usize> {
        self.shifts.iter().position(|s| s.id == shift_id)
    }

    pub fn employee(&self, idx: usize) -> &PlanningEmployee {
        &self.employees[idx]
    }

    pub fn assignments_for_employee(&self, employee_idx: usize) -> impl Iterator<Item = &DayAssignment> {
        self.assignments.iter().filter(move |a| a.employee_idx == employee_idx)
    }
}

/// Builds the planning model from the normalized catalog plus the
/// precomputed forbidden transitions and weekend pairs (spec §4.B/§4.C).
pub fn build_schedule(
    catalog: &Catalog,
    forbidden_transitions: &HashSet<(String, String)>,
    weekend_pairs: &[(NaiveDate, NaiveDate)],
    config: &crate::config::Config,
) -> MonthlySchedule {
    let shift_ids: Vec<&String> = catalog.shifts.keys().collect();
    let shift_index_of: std::collections::HashMap<&str, usize> =
        shift_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let shifts: Vec<PlanningShift> = shift_ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let shift = &catalog.shifts[id.as_str()];
            let function_ids: HashSet<String> = catalog
                .functions
                .values()
                .filter(|f| f.qualifications.contains(shift.id.as_str()))
                .map(|f| f.id.clone())
                .collect();
            PlanningShift { index, id: shift.id.clone(), duration_minutes: shift.duration_minutes, function_ids }
        })
        .collect();

    let groups: Vec<PlanningGroup> = catalog
        .groups
        .iter()
        .enumerate()
        .map(|(index, g)| {
            let hard_override = config.group_min_off_days.get(&g.name).copied().filter(|&v| v > 0);
            PlanningGroup {
                index,
                name: g.name.clone(),
                member_indices: g.member_indices.clone(),
                hard_min_off_days: hard_override,
                soft_off_days_target: config.off_days_target_for_group(&g.name),
            }
        })
        .collect();

    let employees: Vec<PlanningEmployee> = catalog
        .employees
        .iter()
        .enumerate()
        .map(|(index, e)| {
            let group_index = catalog.groups.iter().position(|g| g.member_indices.contains(&index));
            let mut holiday_dates = HashSet::new();
            let mut fixed_off_weekdays = HashSet::new();
            let mut max_hours = None;
            let mut max_shifts_per_function = Vec::new();
            for c in &e.constraints {
                match c {
                    crate::catalog::EmployeeConstraint::Holiday(d) => {
                        holiday_dates.insert(*d);
                    }
                    crate::catalog::EmployeeConstraint::FixedOff(wd) => {
                        fixed_off_weekdays.insert(wd.num_days_from_monday() as u8);
                    }
                    crate::catalog::EmployeeConstraint::MaxHours(v) => max_hours = Some(*v),
                    crate::catalog::EmployeeConstraint::MaxShiftsPerQualif(f, v) => {
                        max_shifts_per_function.push((f.clone(), *v));
                    }
                }
            }
            let qualified_shift_indices = e
                .qualifications
                .iter()
                .filter_map(|id| shift_index_of.get(id.as_str()).copied())
                .collect();

            PlanningEmployee {
                index,
                id: e.id.clone(),
                name: e.name.clone(),
                held_function_ids: e.functions.clone(),
                qualified_shift_indices,
                holiday_dates,
                fixed_off_weekdays,
                max_hours,
                max_shifts_per_function,
                group_index,
            }
        })
        .collect();

    let forbidden_transitions: Vec<ForbiddenTransition> = forbidden_transitions
        .iter()
        .filter_map(|(from, to)| {
            Some(ForbiddenTransition {
                from_shift_idx: *shift_index_of.get(from.as_str())?,
                to_shift_idx: *shift_index_of.get(to.as_str())?,
            })
        })
        .collect();

    let needs: Vec<PlanningNeed> = catalog
        .needs
        .iter()
        .filter_map(|n| {
            Some(PlanningNeed { date: n.date, shift_idx: *shift_index_of.get(n.shift_id.as_str())?, count: n.count })
        })
        .collect();

    let weekends: Vec<PlanningWeekend> =
        weekend_pairs.iter().map(|(sat, sun)| PlanningWeekend { saturday: *sat, sunday: *sun }).collect();

    let specific_agent_rules: Vec<SpecificAgentRuleFact> = config
        .specific_agent_rules
        .iter()
        .map(|rule| SpecificAgentRuleFact {
            employee_indices: rule
                .agent_ids
                .iter()
                .filter_map(|id| catalog.employee_index_by_id.get(id).copied())
                .collect(),
            target_function: rule.target_function.clone(),
            min_count: rule.min_count,
        })
        .collect();

    let mut assignments = Vec::with_capacity(catalog.employees.len() * catalog.horizon.len());
    for employee in &employees {
        for &date in &catalog.horizon {
            assignments.push(DayAssignment {
                id: format!("{}:{}", employee.id, date),
                employee_idx: employee.index,
                date,
                shift_idx: None,
            });
        }
    }

    MonthlySchedule {
        employees,
        shifts,
        groups,
        forbidden_transitions,
        needs,
        weekends,
        specific_agent_rules,
        assignments,
        score: None,
        solver_status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, EmployeeInput, NeedInput, ShiftsCatalogEntry};
    use std::collections::HashMap;

    fn small_catalog() -> Catalog {
        let mut shifts = HashMap::new();
        shifts.insert("A".to_string(), ShiftsCatalogEntry { start_time: "08:00".to_string(), end_time: "16:00".to_string() });
        let employees = vec![EmployeeInput { id: "e1".to_string(), name: "Alice".to_string(), function_ids: vec![], constraints: vec![] }];
        let needs = vec![NeedInput { date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), shift_id: "A".to_string(), count: 1 }];
        Catalog::build(&shifts, &[], &employees, &needs, &HashMap::new()).unwrap().0
    }

    #[test]
    fn one_assignment_entity_per_employee_per_horizon_day() {
        let catalog = small_catalog();
        let config = crate::config::Config {
            min_rest_hours: 11,
            solver_time_limit_seconds: 5,
            min_off_days_per_month: 8,
            max_consecutive_work_days: 6,
            group_min_off_days: HashMap::new(),
            specific_agent_rules: vec![],
            penalties: crate::config::Penalties::default(),
        };
        let forbidden = HashSet::new();
        let schedule = build_schedule(&catalog, &forbidden, &[], &config);
        assert_eq!(schedule.assignments.len(), catalog.employees.len() * catalog.horizon.len());
        assert!(schedule.assignments.iter().all(|a| a.shift_idx.is_none()));
    }
}
