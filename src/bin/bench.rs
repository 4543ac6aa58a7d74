//! Benchmark for incremental scoring performance, adapted from the
//! upstream quickstart's do/undo cycle to this crate's `DayAssignment`
//! planning variable.

use std::collections::HashMap;
use std::time::Instant;

use monthly_shift_scheduler::catalog::Catalog;
use monthly_shift_scheduler::config::{Config, Penalties};
use monthly_shift_scheduler::demo_data::{self, DemoSize};
use monthly_shift_scheduler::domain::build_schedule;
use monthly_shift_scheduler::constraints;
use monthly_shift_scheduler::precompute::{forbidden_transitions, weekend_pairs};
use solverforge::TypedScoreDirector;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bench=info".parse().unwrap()))
        .init();

    let input = demo_data::generate(DemoSize::Large, 42);
    let (catalog, _warnings) =
        Catalog::build(&input.shifts_catalog, &input.functions_catalog, &input.employees, &input.daily_needs, &input.groups)
            .expect("synthetic demo data is internally consistent");

    let config = Config {
        min_rest_hours: 11,
        solver_time_limit_seconds: 30,
        min_off_days_per_month: 8,
        max_consecutive_work_days: 6,
        group_min_off_days: HashMap::new(),
        specific_agent_rules: vec![],
        penalties: Penalties::default(),
    };

    let forbidden = forbidden_transitions(&catalog.shifts, config.min_rest_hours);
    let weekends = weekend_pairs(&catalog.horizon);
    let schedule = build_schedule(&catalog, &forbidden, &weekends, &config);

    let n_assignments = schedule.assignments.len();
    let n_shifts = schedule.shifts.len();

    println!("Benchmark: Incremental Scoring (Fluent API)");
    println!("  Assignments: {n_assignments}");
    println!("  Shift types: {n_shifts}");
    println!();

    let forbidden_pairs = schedule.forbidden_transitions.iter().map(|t| (t.from_shift_idx, t.to_shift_idx)).collect();
    let needed_pairs = schedule.needs.iter().map(|n| (n.date, n.shift_idx)).collect();
    let constraint_set = constraints::create_fluent_constraints(&config, forbidden_pairs, needed_pairs);
    let mut director = TypedScoreDirector::new(schedule, constraint_set);

    let init_start = Instant::now();
    let initial_score = director.calculate_score();
    println!("Initial score: {} ({:?})", initial_score, init_start.elapsed());
    println!();

    let bench_start = Instant::now();
    let mut moves: u64 = 0;

    for entity_idx in 0..n_assignments {
        let old_value = director.working_solution().assignments[entity_idx].shift_idx;

        for shift_idx in 0..n_shifts {
            director.before_variable_changed(entity_idx);
            director.working_solution_mut().assignments[entity_idx].shift_idx = Some(shift_idx);
            director.after_variable_changed(entity_idx);
            let _ = director.get_score();
            moves += 1;

            director.before_variable_changed(entity_idx);
            director.working_solution_mut().assignments[entity_idx].shift_idx = old_value;
            director.after_variable_changed(entity_idx);
            let _ = director.get_score();
            moves += 1;
        }
    }

    let elapsed = bench_start.elapsed();
    let moves_per_sec = moves as f64 / elapsed.as_secs_f64();

    println!("Results:");
    println!("  Moves: {moves}");
    println!("  Time: {elapsed:.2?}");
    println!("  Moves/sec: {moves_per_sec:.0}");

    let final_score = director.get_score();
    assert_eq!(initial_score, final_score, "Score corrupted!");
    println!("  Final score: {final_score} (verified)");
}
