//! Whole-solution aggregate scoring (spec §4.C), for rules that need a full
//! per-employee or per-group pass over the month rather than a pairwise
//! join: monthly caps, equity gaps between group members, and sliding
//! consecutive-day windows. Mirrors the upstream quickstart's
//! `EasyScoreCalculator` escape hatch for exactly this situation, combined
//! with the fluent constraints in `constraints.rs` by simple addition.

use std::collections::HashMap;

use solverforge::prelude::HardSoftDecimalScore;

use crate::config::Config;
use crate::domain::MonthlySchedule;

const TRI_GROUP_NAME: &str = "3. TRI";
const TRI_TARGET_FUNCTION: &str = "BEUA-F";
const TRI_MIN_SHIFTS: i64 = 4;

/// Scores every rule that isn't naturally pairwise: §4.C.1 rules 2-6 minus
/// the ones already covered fluently, rule 7 (tri-group), and soft rules
/// S2-S7. Returns a score to be added to the fluent `ConstraintFactory`
/// score (spec's combined hard+soft objective).
pub fn score_aggregate_rules(schedule: &MonthlySchedule, config: &Config) -> HardSoftDecimalScore {
    let mut score = HardSoftDecimalScore::ZERO;

    let work_days_per_employee = work_days_per_employee(schedule);
    let shifts_per_function_per_employee = shifts_per_function_per_employee(schedule);

    score = score + score_max_hours(schedule, &work_days_per_employee);
    score = score + score_max_shifts_per_function(schedule, &shifts_per_function_per_employee);
    score = score + score_group_min_off_days(schedule, &work_days_per_employee, config);
    score = score + score_specific_agent_rules(schedule, &shifts_per_function_per_employee);
    score = score + score_tri_group_rule(schedule, &shifts_per_function_per_employee);
    score = score + score_min_off_days_soft(schedule, &work_days_per_employee, config);
    score = score + score_guaranteed_weekend(schedule, config);
    score = score + score_work_days_equity(schedule, &work_days_per_employee, config);
    score = score + score_shift_equity(schedule, &shifts_per_function_per_employee, config);
    score = score + score_max_consecutive_work_days(schedule, config);
    score = score + score_isolated_day_off(schedule, config);

    score
}

fn work_days_per_employee(schedule: &MonthlySchedule) -> HashMap<usize, i64> {
    let mut counts = HashMap::new();
    for a in &schedule.assignments {
        if a.shift_idx.is_some() {
            *counts.entry(a.employee_idx).or_insert(0) += 1;
        }
    }
    counts
}

/// `shifts_per_function[e,f]` is only defined for `f` among the functions
/// employee `e` actually holds — a shift can list several functions as
/// qualified for it, but it only counts against the functions the assigned
/// employee personally holds, not every function that happens to share the
/// shift id.
pub(crate) fn shifts_per_function_per_employee(schedule: &MonthlySchedule) -> HashMap<(usize, String), i64> {
    let mut counts = HashMap::new();
    for a in &schedule.assignments {
        let Some(shift_idx) = a.shift_idx else { continue };
        let shift = &schedule.shifts[shift_idx];
        let employee = &schedule.employees[a.employee_idx];
        for function_id in &shift.function_ids {
            if employee.held_function_ids.contains(function_id) {
                *counts.entry((a.employee_idx, function_id.clone())).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// HARD: Personal `MaxHours` cap (spec §4.C.1 rule 3).
fn score_max_hours(schedule: &MonthlySchedule, work_days: &HashMap<usize, i64>) -> HardSoftDecimalScore {
    let mut hours_worked: HashMap<usize, i64> = HashMap::new();
    for a in &schedule.assignments {
        let Some(shift_idx) = a.shift_idx else { continue };
        *hours_worked.entry(a.employee_idx).or_insert(0) += schedule.shifts[shift_idx].duration_minutes / 60;
    }
    let mut violations = 0i64;
    for employee in &schedule.employees {
        if let Some(max_hours) = employee.max_hours {
            let worked = hours_worked.get(&employee.index).copied().unwrap_or(0);
            if worked > max_hours {
                violations += worked - max_hours;
            }
        }
    }
    let _ = work_days;
    HardSoftDecimalScore::of_hard_scaled(violations)
}

/// HARD: Personal `MaxShiftsPerQualif` cap (spec §4.C.1 rule 4).
fn score_max_shifts_per_function(
    schedule: &MonthlySchedule,
    shifts_per_function: &HashMap<(usize, String), i64>,
) -> HardSoftDecimalScore {
    let mut violations = 0i64;
    for employee in &schedule.employees {
        for (function_id, cap) in &employee.max_shifts_per_function {
            let worked = shifts_per_function.get(&(employee.index, function_id.clone())).copied().unwrap_or(0);
            if worked > *cap {
                violations += worked - cap;
            }
        }
    }
    HardSoftDecimalScore::of_hard_scaled(violations)
}

/// HARD: group's `hard_min_off_days` override (spec §4.C.1 rule 5).
fn score_group_min_off_days(
    schedule: &MonthlySchedule,
    work_days: &HashMap<usize, i64>,
    config: &Config,
) -> HardSoftDecimalScore {
    let total_days = schedule.assignments.iter().map(|a| a.date).collect::<std::collections::HashSet<_>>().len() as i64;
    let mut violations = 0i64;
    for group in &schedule.groups {
        let Some(min_off) = group.hard_min_off_days else { continue };
        for &member_idx in &group.member_indices {
            let worked = work_days.get(&member_idx).copied().unwrap_or(0);
            let off_days = total_days - worked;
            if off_days < min_off {
                violations += min_off - off_days;
            }
        }
    }
    let _ = config;
    HardSoftDecimalScore::of_hard_scaled(violations)
}

/// HARD: `specific_agent_rules` minimum per-function staffing (spec §4.C.1
/// rule 6).
fn score_specific_agent_rules(
    schedule: &MonthlySchedule,
    shifts_per_function: &HashMap<(usize, String), i64>,
) -> HardSoftDecimalScore {
    let mut violations = 0i64;
    for rule in &schedule.specific_agent_rules {
        let total: i64 = rule
            .employee_indices
            .iter()
            .map(|&idx| shifts_per_function.get(&(idx, rule.target_function.clone())).copied().unwrap_or(0))
            .sum();
        if total < rule.min_count {
            violations += rule.min_count - total;
        }
    }
    HardSoftDecimalScore::of_hard_scaled(violations)
}

/// HARD: tri-group rule (spec §4.C.1 rule 7) — every member of the group
/// named `"3. TRI"` who holds the `"BEUA-F"` function must work at least
/// `TRI_MIN_SHIFTS` of it over the horizon. Members who don't hold that
/// function are unaffected, same as the original's `(e.id, fonction_cible) in
/// total_shifts_per_fonction` guard.
fn score_tri_group_rule(
    schedule: &MonthlySchedule,
    shifts_per_function: &HashMap<(usize, String), i64>,
) -> HardSoftDecimalScore {
    let Some(tri_group) = schedule.groups.iter().find(|g| g.name == TRI_GROUP_NAME) else {
        return HardSoftDecimalScore::ZERO;
    };

    let mut violations = 0i64;
    for &member_idx in &tri_group.member_indices {
        let employee = &schedule.employees[member_idx];
        if !employee.held_function_ids.contains(TRI_TARGET_FUNCTION) {
            continue;
        }
        let worked = shifts_per_function.get(&(member_idx, TRI_TARGET_FUNCTION.to_string())).copied().unwrap_or(0);
        if worked < TRI_MIN_SHIFTS {
            violations += TRI_MIN_SHIFTS - worked;
        }
    }
    HardSoftDecimalScore::of_hard_scaled(violations)
}

/// SOFT S2: every employee should reach at least `off_days_target` days off
/// (group override, else the global default).
fn score_min_off_days_soft(
    schedule: &MonthlySchedule,
    work_days: &HashMap<usize, i64>,
    config: &Config,
) -> HardSoftDecimalScore {
    let total_days =
        schedule.assignments.iter().map(|a| a.date).collect::<std::collections::HashSet<_>>().len() as i64;
    let mut shortfall = 0i64;
    for employee in &schedule.employees {
        let target = employee
            .group_index
            .and_then(|idx| schedule.groups.get(idx))
            .map(|g| g.soft_off_days_target)
            .unwrap_or(config.min_off_days_per_month);
        let worked = work_days.get(&employee.index).copied().unwrap_or(0);
        let off_days = total_days - worked;
        if off_days < target {
            shortfall += target - off_days;
        }
    }
    HardSoftDecimalScore::of_soft_scaled(shortfall * config.penalties.per_day_off_missing)
}

/// SOFT S3: every employee should get at least one fully-off weekend.
fn score_guaranteed_weekend(schedule: &MonthlySchedule, config: &Config) -> HardSoftDecimalScore {
    let mut unsatisfied = 0i64;
    for employee in &schedule.employees {
        let has_full_weekend_off = schedule.weekends.iter().any(|w| {
            let sat_off = schedule
                .assignments
                .iter()
                .find(|a| a.employee_idx == employee.index && a.date == w.saturday)
                .is_none_or(|a| a.is_off());
            let sun_off = schedule
                .assignments
                .iter()
                .find(|a| a.employee_idx == employee.index && a.date == w.sunday)
                .is_none_or(|a| a.is_off());
            sat_off && sun_off
        });
        if !has_full_weekend_off && !schedule.weekends.is_empty() {
            unsatisfied += 1;
        }
    }
    HardSoftDecimalScore::of_soft_scaled(unsatisfied * config.penalties.no_weekend_guaranteed)
}

/// SOFT S4: work-day counts within a group should be roughly even.
fn score_work_days_equity(
    schedule: &MonthlySchedule,
    work_days: &HashMap<usize, i64>,
    config: &Config,
) -> HardSoftDecimalScore {
    let mut total_gap = 0i64;
    for group in &schedule.groups {
        if group.member_indices.len() < 2 {
            continue;
        }
        let counts: Vec<i64> = group.member_indices.iter().map(|i| work_days.get(i).copied().unwrap_or(0)).collect();
        let (min, max) = min_max(&counts);
        total_gap += max - min;
    }
    HardSoftDecimalScore::of_soft_scaled(total_gap * config.penalties.penalty_intra_group_work_days_equity_gap)
}

/// SOFT S5: per-function shift counts should be roughly even among group
/// members who actually hold that function (spec §4.C.2 S5). A member who
/// doesn't hold the function isn't part of the comparison at all — mirroring
/// the original's `qualified_agents = [e for e in group_members if func_name
/// in e.fonctions]` filter — so a mixed holder/non-holder group never reports
/// a spurious gap pinned against a non-holder's implicit zero.
fn score_shift_equity(
    schedule: &MonthlySchedule,
    shifts_per_function: &HashMap<(usize, String), i64>,
    config: &Config,
) -> HardSoftDecimalScore {
    let mut total_gap = 0i64;
    let function_ids: std::collections::HashSet<&str> =
        schedule.shifts.iter().flat_map(|s| s.function_ids.iter().map(String::as_str)).collect();

    for group in &schedule.groups {
        for function_id in &function_ids {
            let qualified_members: Vec<usize> = group
                .member_indices
                .iter()
                .copied()
                .filter(|&i| schedule.employees[i].held_function_ids.contains(*function_id))
                .collect();
            if qualified_members.len() < 2 {
                continue;
            }
            let counts: Vec<i64> = qualified_members
                .iter()
                .map(|i| shifts_per_function.get(&(*i, function_id.to_string())).copied().unwrap_or(0))
                .collect();
            let (min, max) = min_max(&counts);
            total_gap += max - min;
        }
    }
    HardSoftDecimalScore::of_soft_scaled(total_gap * config.penalties.penalty_intra_group_shift_equity_gap)
}

/// SOFT S6: no more than `max_consecutive_work_days` worked in a row.
fn score_max_consecutive_work_days(schedule: &MonthlySchedule, config: &Config) -> HardSoftDecimalScore {
    let mut violations = 0i64;
    for employee in &schedule.employees {
        let mut dates: Vec<_> = schedule
            .assignments
            .iter()
            .filter(|a| a.employee_idx == employee.index && a.shift_idx.is_some())
            .map(|a| a.date)
            .collect();
        dates.sort();
        let mut run = 0i64;
        let mut prev = None;
        for date in dates {
            run = match prev {
                Some(p) if p + chrono::Duration::days(1) == date => run + 1,
                _ => 1,
            };
            prev = Some(date);
            if run > config.max_consecutive_work_days {
                violations += run - config.max_consecutive_work_days;
            }
        }
    }
    HardSoftDecimalScore::of_soft_scaled(violations * config.penalties.per_consecutive_work_day_violation)
}

/// SOFT S7: a single day off sandwiched between two work days is
/// discouraged (a lone day off wastes rest relative to a grouped block).
fn score_isolated_day_off(schedule: &MonthlySchedule, config: &Config) -> HardSoftDecimalScore {
    let mut isolated = 0i64;
    for employee in &schedule.employees {
        let mut by_date: HashMap<chrono::NaiveDate, bool> = HashMap::new();
        for a in schedule.assignments_for_employee(employee.index) {
            by_date.insert(a.date, a.is_off());
        }
        let mut dates: Vec<_> = by_date.keys().copied().collect();
        dates.sort();
        for window in dates.windows(3) {
            let (d0, d1, d2) = (window[0], window[1], window[2]);
            let consecutive = d0 + chrono::Duration::days(1) == d1 && d1 + chrono::Duration::days(1) == d2;
            if consecutive && !by_date[&d0] && by_date[&d1] && !by_date[&d2] {
                isolated += 1;
            }
        }
    }
    HardSoftDecimalScore::of_soft_scaled(isolated * config.penalties.penalty_isolated_day_off)
}

fn min_max(values: &[i64]) -> (i64, i64) {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DayAssignment, PlanningEmployee, PlanningShift};
    use chrono::NaiveDate;

    fn base_schedule() -> MonthlySchedule {
        MonthlySchedule {
            employees: vec![PlanningEmployee {
                index: 0,
                id: "e1".into(),
                name: "Alice".into(),
                held_function_ids: Default::default(),
                qualified_shift_indices: [0].into_iter().collect(),
                holiday_dates: Default::default(),
                fixed_off_weekdays: Default::default(),
                max_hours: Some(10),
                max_shifts_per_function: vec![],
                group_index: None,
            }],
            shifts: vec![PlanningShift { index: 0, id: "A".into(), duration_minutes: 8 * 60, function_ids: Default::default() }],
            groups: vec![],
            forbidden_transitions: vec![],
            needs: vec![],
            weekends: vec![],
            specific_agent_rules: vec![],
            assignments: vec![],
            score: None,
            solver_status: None,
        }
    }

    #[test]
    fn max_hours_violation_counts_overage_in_hours() {
        let mut schedule = base_schedule();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for day in 0..2 {
            schedule.assignments.push(DayAssignment {
                id: format!("e1:{day}"),
                employee_idx: 0,
                date: date + chrono::Duration::days(day),
                shift_idx: Some(0),
            });
        }
        let work_days = work_days_per_employee(&schedule);
        let score = score_max_hours(&schedule, &work_days);
        // 2 shifts * 8h = 16h worked against a 10h cap -> 6h overage.
        assert_eq!(score, HardSoftDecimalScore::of_hard_scaled(6));
    }

    #[test]
    fn tri_group_rule_is_a_no_op_without_a_tri_group() {
        let schedule = base_schedule();
        let shifts_per_function = shifts_per_function_per_employee(&schedule);
        assert_eq!(score_tri_group_rule(&schedule, &shifts_per_function), HardSoftDecimalScore::ZERO);
    }

    #[test]
    fn tri_group_floor_only_applies_to_members_holding_beua_f() {
        let mut schedule = base_schedule();
        schedule.employees[0].held_function_ids = [TRI_TARGET_FUNCTION.to_string()].into_iter().collect();
        schedule.shifts[0].function_ids = [TRI_TARGET_FUNCTION.to_string()].into_iter().collect();
        schedule.groups.push(crate::domain::PlanningGroup {
            index: 0,
            name: TRI_GROUP_NAME.to_string(),
            member_indices: vec![0],
            hard_min_off_days: None,
            soft_off_days_target: 8,
        });
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        schedule.assignments.push(DayAssignment { id: "e1:0".into(), employee_idx: 0, date, shift_idx: Some(0) });

        let shifts_per_function = shifts_per_function_per_employee(&schedule);
        // Only 1 BEUA-F shift worked against a floor of 4 -> 3 missing.
        let score = score_tri_group_rule(&schedule, &shifts_per_function);
        assert_eq!(score, HardSoftDecimalScore::of_hard_scaled(3));

        // A member who doesn't hold BEUA-F is exempt from the floor entirely.
        schedule.employees[0].held_function_ids.clear();
        let shifts_per_function = shifts_per_function_per_employee(&schedule);
        assert_eq!(score_tri_group_rule(&schedule, &shifts_per_function), HardSoftDecimalScore::ZERO);
    }

    #[test]
    fn shift_equity_ignores_members_who_do_not_hold_the_function() {
        let mut schedule = base_schedule();
        schedule.employees[0].held_function_ids = ["BEUA-F".to_string()].into_iter().collect();
        schedule.employees.push(PlanningEmployee {
            index: 1,
            id: "e2".into(),
            name: "Bob".into(),
            held_function_ids: Default::default(),
            qualified_shift_indices: [0].into_iter().collect(),
            holiday_dates: Default::default(),
            fixed_off_weekdays: Default::default(),
            max_hours: None,
            max_shifts_per_function: vec![],
            group_index: None,
        });
        schedule.shifts[0].function_ids = ["BEUA-F".to_string()].into_iter().collect();
        schedule.groups.push(crate::domain::PlanningGroup {
            index: 0,
            name: "Group".to_string(),
            member_indices: vec![0, 1],
            hard_min_off_days: None,
            soft_off_days_target: 8,
        });
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        schedule.assignments.push(DayAssignment { id: "e1:0".into(), employee_idx: 0, date, shift_idx: Some(0) });

        let config = crate::config::Config {
            min_rest_hours: 11,
            solver_time_limit_seconds: 1,
            min_off_days_per_month: 8,
            max_consecutive_work_days: 6,
            group_min_off_days: HashMap::new(),
            specific_agent_rules: vec![],
            penalties: crate::config::Penalties::default(),
        };
        let shifts_per_function = shifts_per_function_per_employee(&schedule);
        // Bob never holds BEUA-F, so he's excluded from the comparison and
        // the lone holder (Alice) trivially has zero gap against herself.
        let score = score_shift_equity(&schedule, &shifts_per_function, &config);
        assert_eq!(score, HardSoftDecimalScore::ZERO);
    }
}
