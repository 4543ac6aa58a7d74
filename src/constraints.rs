//! Fluent-stream constraints (spec §4.C), for the rules that reduce to a
//! join/filter/group-by shape. The remaining rules, which need whole-month
//! per-employee or per-group aggregates (equity gaps, monthly caps, sliding
//! consecutive-day windows), are implemented in `aggregate.rs` instead — the
//! same "EasyScoreCalculator alongside constraint streams" split this solver
//! family has always offered for aggregate-heavy domains.

use std::collections::HashSet;

use chrono::NaiveDate;
use solverforge::prelude::*;
use solverforge::stream::joiner::equal_bi;
use solverforge::stream::ConstraintCollectors;

use crate::config::Config;
use crate::domain::{DayAssignment, MonthlySchedule, PlanningEmployee, PlanningNeed};

/// Creates every join/filter/group-by-shaped constraint (fully monomorphized,
/// no `dyn`), combined via the same tuple-of-constraints idiom the domain's
/// upstream quickstart uses.
///
/// `forbidden_pairs` and `needed_pairs` are precomputed once at model-build
/// time rather than re-derived per constraint call: both are plain lookups
/// against static facts, so there's no benefit to expressing them as their
/// own problem-fact joins over `forbidden_transitions`/`needs` here.
pub fn create_fluent_constraints(
    config: &Config,
    forbidden_pairs: HashSet<(usize, usize)>,
    needed_pairs: HashSet<(NaiveDate, usize)>,
) -> impl ConstraintSet<MonthlySchedule, HardSoftDecimalScore> {
    let factory = ConstraintFactory::<MonthlySchedule, HardSoftDecimalScore>::new();
    let per_missing_need_unit = config.penalties.per_missing_need_unit;

    // =========================================================================
    // HARD: Qualified shift
    // =========================================================================
    // Domain-restriction surrogate (spec §4.C intro / §5): assignments only
    // exist for `s ∈ e.qualifications`; this constraint makes that true even
    // though the planning variable's own domain is unrestricted.
    let qualified_shift = factory
        .clone()
        .for_each(|s: &MonthlySchedule| s.assignments.as_slice())
        .join(
            |s: &MonthlySchedule| s.employees.as_slice(),
            equal_bi(|a: &DayAssignment| a.employee_idx, |e: &PlanningEmployee| e.index),
        )
        .filter(|a: &DayAssignment, e: &PlanningEmployee| {
            a.shift_idx.is_some_and(|idx| !e.qualified_shift_indices.contains(&idx))
        })
        .penalize(HardSoftDecimalScore::ONE_HARD)
        .as_constraint("Qualified shift");

    // =========================================================================
    // HARD: Minimum rest between consecutive days
    // =========================================================================
    let min_rest = factory
        .clone()
        .for_each(|s: &MonthlySchedule| s.assignments.as_slice())
        .join(
            |s: &MonthlySchedule| s.assignments.as_slice(),
            equal_bi(
                |a: &DayAssignment| (a.employee_idx, a.date.succ_opt()),
                |b: &DayAssignment| (b.employee_idx, Some(b.date)),
            ),
        )
        .filter(move |a: &DayAssignment, b: &DayAssignment| match (a.shift_idx, b.shift_idx) {
            (Some(s1), Some(s2)) => forbidden_pairs.contains(&(s1, s2)),
            _ => false,
        })
        .penalize(HardSoftDecimalScore::ONE_HARD)
        .as_constraint("Minimum rest between shifts");

    // =========================================================================
    // HARD: Holiday (personal constraint)
    // =========================================================================
    let holiday = factory
        .clone()
        .for_each(|s: &MonthlySchedule| s.assignments.as_slice())
        .join(
            |s: &MonthlySchedule| s.employees.as_slice(),
            equal_bi(|a: &DayAssignment| a.employee_idx, |e: &PlanningEmployee| e.index),
        )
        .filter(|a: &DayAssignment, e: &PlanningEmployee| a.shift_idx.is_some() && e.holiday_dates.contains(&a.date))
        .penalize(HardSoftDecimalScore::ONE_HARD)
        .as_constraint("Holiday constraint violated");

    // =========================================================================
    // HARD: Fixed day off (personal constraint)
    // =========================================================================
    let fixed_off = factory
        .clone()
        .for_each(|s: &MonthlySchedule| s.assignments.as_slice())
        .join(
            |s: &MonthlySchedule| s.employees.as_slice(),
            equal_bi(|a: &DayAssignment| a.employee_idx, |e: &PlanningEmployee| e.index),
        )
        .filter(|a: &DayAssignment, e: &PlanningEmployee| {
            a.shift_idx.is_some() && e.fixed_off_weekdays.contains(&crate::domain::weekday_index(a.date))
        })
        .penalize(HardSoftDecimalScore::ONE_HARD)
        .as_constraint("Fixed day off violated");

    // =========================================================================
    // HARD: Unwanted shift forbidden
    // =========================================================================
    // A shift assigned on a day/shift pair that has no demand entry at all
    // (e.g. a night shift posted on a day `daily_needs` never asked for it).
    let unwanted_shift_forbidden = factory
        .clone()
        .for_each(|s: &MonthlySchedule| s.assignments.as_slice())
        .filter(move |a: &DayAssignment| a.shift_idx.is_some_and(|idx| !needed_pairs.contains(&(a.date, idx))))
        .penalize(HardSoftDecimalScore::ONE_HARD)
        .as_constraint("Unwanted shift forbidden");

    // =========================================================================
    // SOFT: Demand coverage (S1)
    // =========================================================================
    // Count assignments per (date, shift), join against the posted need, and
    // penalize proportionally to the shortfall.
    let demand_coverage = factory
        .for_each(|s: &MonthlySchedule| s.assignments.as_slice())
        .filter(|a: &DayAssignment| a.shift_idx.is_some())
        .group_by(
            |a: &DayAssignment| (a.date, a.shift_idx.expect("filtered to assigned rows")),
            ConstraintCollectors::count(),
        )
        .join(
            |s: &MonthlySchedule| s.needs.as_slice(),
            equal_bi(|(key, _count): &((NaiveDate, usize), i64)| *key, |n: &PlanningNeed| (n.date, n.shift_idx)),
        )
        .filter(|(_key, count): &((NaiveDate, usize), i64), need: &PlanningNeed| *count < need.count)
        .penalize_soft_with(move |(_key, count): &((NaiveDate, usize), i64), need: &PlanningNeed| {
            HardSoftDecimalScore::of_soft_scaled((need.count - count) * per_missing_need_unit)
        })
        .as_constraint("Demand coverage shortfall");

    (qualified_shift, min_rest, holiday, fixed_off, unwanted_shift_forbidden, demand_coverage)
}
