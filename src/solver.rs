//! Search driver (spec §4.D).
//!
//! Every teacher call site (`employee-scheduling/src/solver.rs`,
//! `api.rs::create_schedule`, `demo_data.rs`'s own test) reaches
//! `solverforge::Solvable::solve`/`SolverManager` purely through the
//! `#[planning_solution]` macro on the schedule type — none of them show a
//! way to hand that entry point a *second*, whole-solution scoring pass
//! alongside the fluent `ConstraintFactory` one, which is what combining
//! `constraints.rs` with `aggregate.rs`'s monthly/group aggregates requires.
//! Rather than guess at an undocumented hook, this drives a
//! `TypedScoreDirector` directly with do/undo moves (the same incremental-
//! scoring idiom as the upstream benchmark's harness), wrapped in a
//! simulated-annealing acceptance rule instead of a plain hill-climb so it
//! still has a way out of local optima once the group-level hard rules and
//! whole-month soft equity couple many variables together. The annealing
//! schedule (geometric cooling from an initial to a final temperature) is
//! the same shape `other_examples`' GroupMixer solver exposes as
//! `SimulatedAnnealingParams`; hard-score regressions are never annealed
//! into, only soft-score ones, since a worse hard score is never an
//! acceptable trade against annealed soft slack.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use solverforge::prelude::*;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::aggregate::score_aggregate_rules;
use crate::config::Config;
use crate::constraints::create_fluent_constraints;
use crate::domain::MonthlySchedule;
use crate::error::ScheduleResult;

/// Final outcome of a solve attempt (spec §7: a timed-out search with a
/// hard-constraint violation still present is `NoSolution`, not an error).
pub enum SolveOutcome {
    Solved(MonthlySchedule),
    NoSolution,
}

fn combined_score(director: &mut TypedScoreDirector<MonthlySchedule, impl ConstraintSet<MonthlySchedule, HardSoftDecimalScore>>, config: &Config) -> HardSoftDecimalScore {
    director.calculate_score() + score_aggregate_rules(director.working_solution(), config)
}

fn forbidden_pairs(schedule: &MonthlySchedule) -> HashSet<(usize, usize)> {
    schedule.forbidden_transitions.iter().map(|t| (t.from_shift_idx, t.to_shift_idx)).collect()
}

fn needed_pairs(schedule: &MonthlySchedule) -> HashSet<(chrono::NaiveDate, usize)> {
    schedule.needs.iter().map(|n| (n.date, n.shift_idx)).collect()
}

/// Runs the search and streams each improving incumbent over `incumbents`,
/// mirroring the upstream server's "stream partial solutions back to the
/// caller while solving" pattern, minus the job-tracking HTTP surface.
pub fn run_solve(
    schedule: MonthlySchedule,
    config: &Config,
    incumbents: Option<UnboundedSender<(MonthlySchedule, HardSoftDecimalScore)>>,
    terminate: Option<Arc<AtomicBool>>,
) -> ScheduleResult<SolveOutcome> {
    let forbidden = forbidden_pairs(&schedule);
    let needed = needed_pairs(&schedule);
    let constraint_set = create_fluent_constraints(config, forbidden, needed);

    let employee_count = schedule.employees.len();
    let shift_count = schedule.shifts.len();
    let mut director = TypedScoreDirector::new(schedule, constraint_set);

    let mut best_score = combined_score(&mut director, config);
    let mut best_solution = director.working_solution().clone();
    info!(?best_score, "starting search");

    let start = Instant::now();
    let deadline = start + Duration::from_secs(config.solver_time_limit_seconds);
    let mut rng = rand::thread_rng();
    let mut iterations: u64 = 0;

    const INITIAL_TEMPERATURE: f64 = 10.0;
    const FINAL_TEMPERATURE: f64 = 0.1;
    let cooling_rate = (FINAL_TEMPERATURE / INITIAL_TEMPERATURE).powf(1.0 / 20_000.0);
    let mut temperature = INITIAL_TEMPERATURE;

    let mut current_score = best_score;

    while Instant::now() < deadline {
        if terminate.as_ref().is_some_and(|t| t.load(Ordering::SeqCst)) {
            info!("search terminated by caller");
            break;
        }
        iterations += 1;
        temperature = (temperature * cooling_rate).max(FINAL_TEMPERATURE);

        let assignment_count = director.working_solution().assignments.len();
        if assignment_count == 0 {
            break;
        }
        let entity_idx = rng.gen_range(0..assignment_count);
        let old_value = director.working_solution().assignments[entity_idx].shift_idx;

        let new_value = if shift_count == 0 || rng.gen_bool(0.15) {
            None
        } else {
            Some(rng.gen_range(0..shift_count))
        };
        if new_value == old_value {
            continue;
        }

        director.before_variable_changed(entity_idx);
        director.working_solution_mut().assignments[entity_idx].shift_idx = new_value;
        director.after_variable_changed(entity_idx);

        let candidate_score = combined_score(&mut director, config);
        let hard_delta = candidate_score.hard_score() - current_score.hard_score();
        let soft_delta = candidate_score.soft_score() - current_score.soft_score();

        // Never anneal into a hard-score regression; a worse soft score is
        // only accepted probabilistically, and only when hard score didn't
        // get worse either.
        let accept = if hard_delta > 0.0 {
            true
        } else if hard_delta < 0.0 {
            false
        } else if soft_delta >= 0.0 {
            true
        } else {
            rng.gen_bool((soft_delta / temperature).exp().clamp(0.0, 1.0))
        };

        if accept {
            current_score = candidate_score;
            if candidate_score > best_score {
                best_score = candidate_score;
                best_solution = director.working_solution().clone();
                if let Some(sender) = &incumbents {
                    let _ = sender.send((best_solution.clone(), best_score));
                }
            }
        } else {
            director.before_variable_changed(entity_idx);
            director.working_solution_mut().assignments[entity_idx].shift_idx = old_value;
            director.after_variable_changed(entity_idx);
        }
    }

    info!(iterations, employee_count, temperature, ?best_score, "search complete");

    if best_score.hard_score() < 0.0 {
        return Ok(SolveOutcome::NoSolution);
    }

    best_solution.score = Some(best_score);
    Ok(SolveOutcome::Solved(best_solution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, EmployeeInput, NeedInput, ShiftsCatalogEntry};
    use crate::domain::build_schedule;
    use std::collections::HashMap;

    fn tiny_config() -> Config {
        Config {
            min_rest_hours: 11,
            solver_time_limit_seconds: 1,
            min_off_days_per_month: 1,
            max_consecutive_work_days: 6,
            group_min_off_days: HashMap::new(),
            specific_agent_rules: vec![],
            penalties: crate::config::Penalties::default(),
        }
    }

    #[test]
    fn search_terminates_within_its_time_budget_and_returns_a_schedule() {
        let mut shifts = HashMap::new();
        shifts.insert("A".to_string(), ShiftsCatalogEntry { start_time: "08:00".to_string(), end_time: "16:00".to_string() });
        let employees = vec![EmployeeInput { id: "e1".to_string(), name: "Alice".to_string(), function_ids: vec![], constraints: vec![] }];
        let needs = vec![NeedInput { date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), shift_id: "A".to_string(), count: 1 }];
        let (catalog, _warnings) = Catalog::build(&shifts, &[], &employees, &needs, &HashMap::new()).unwrap();
        let config = tiny_config();
        let schedule = build_schedule(&catalog, &HashSet::new(), &[], &config);

        let outcome = run_solve(schedule, &config, None, None).unwrap();
        assert!(matches!(outcome, SolveOutcome::Solved(_) | SolveOutcome::NoSolution));
    }

    /// Spec scenario "Rest violation blocked": an employee qualified for an
    /// overnight `LATE` shift and an `EARLY` shift next-day cannot legally
    /// work both back to back (rest = 2h, well under the 11h minimum). The
    /// combined score must carry a hard violation when both are assigned.
    #[test]
    fn back_to_back_late_then_early_shift_is_a_hard_violation() {
        let mut shifts = HashMap::new();
        shifts.insert("LATE".to_string(), ShiftsCatalogEntry { start_time: "20:00".to_string(), end_time: "04:00".to_string() });
        shifts.insert("EARLY".to_string(), ShiftsCatalogEntry { start_time: "06:00".to_string(), end_time: "14:00".to_string() });
        let employees = vec![EmployeeInput { id: "e1".to_string(), name: "Alice".to_string(), function_ids: vec![], constraints: vec![] }];
        let day1 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let day2 = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let needs = vec![
            NeedInput { date: day1, shift_id: "LATE".to_string(), count: 1 },
            NeedInput { date: day2, shift_id: "EARLY".to_string(), count: 1 },
        ];
        let (catalog, _warnings) = Catalog::build(&shifts, &[], &employees, &needs, &HashMap::new()).unwrap();
        // Employee isn't formally qualified in this minimal fixture, but the
        // qualified-shift constraint is scored independently of rest, so we
        // only need `shift_idx` populated to exercise the rest-rule join.
        let config = tiny_config();
        let forbidden = crate::precompute::forbidden_transitions(&catalog.shifts, config.min_rest_hours);
        assert!(forbidden.contains(&("LATE".to_string(), "EARLY".to_string())));

        let mut schedule = build_schedule(&catalog, &forbidden, &[], &config);
        let late_idx = schedule.shift_index("LATE").unwrap();
        let early_idx = schedule.shift_index("EARLY").unwrap();
        for assignment in schedule.assignments.iter_mut() {
            if assignment.date == day1 {
                assignment.shift_idx = Some(late_idx);
            } else if assignment.date == day2 {
                assignment.shift_idx = Some(early_idx);
            }
        }

        let forbidden_pairs = forbidden_pairs(&schedule);
        let needed_pairs = needed_pairs(&schedule);
        let constraint_set = create_fluent_constraints(&config, forbidden_pairs, needed_pairs);
        let mut director = TypedScoreDirector::new(schedule, constraint_set);
        let score = combined_score(&mut director, &config);
        assert!(score.hard_score() < 0.0, "expected a hard violation for the back-to-back transition");
    }
}
