//! Monthly employee shift scheduling engine.
//!
//! Provides the normalized domain model, the solverforge planning model and
//! constraints, the search driver, and the result extractor/auditor. The
//! surrounding web/HTTP/admin surface is this crate's caller's concern, not
//! this crate's.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod precompute;
pub mod report;
pub mod solver;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use catalog::Catalog;
use config::Config;
use domain::{build_schedule, MonthlySchedule};
use error::{ScheduleError, ScheduleResult};
use extract::PlanningTable;
use report::AuditReport;
use solver::SolveOutcome;

/// Runs the full pipeline end to end: precompute derived facts, build the
/// planning model, search for a schedule, and extract the planning table.
/// Returns `ScheduleError::NoSolution` if the search never finds a schedule
/// free of hard-constraint violations within its time budget.
pub fn schedule_month(
    catalog: &Catalog,
    config: &Config,
    incumbents: Option<UnboundedSender<(MonthlySchedule, solverforge::prelude::HardSoftDecimalScore)>>,
    terminate: Option<Arc<AtomicBool>>,
) -> ScheduleResult<(MonthlySchedule, PlanningTable, AuditReport)> {
    let forbidden = precompute::forbidden_transitions(&catalog.shifts, config.min_rest_hours);
    let weekends = precompute::weekend_pairs(&catalog.horizon);
    let schedule = build_schedule(catalog, &forbidden, &weekends, config);

    match solver::run_solve(schedule, config, incumbents, terminate)? {
        SolveOutcome::NoSolution => Err(ScheduleError::NoSolution),
        SolveOutcome::Solved(solved) => {
            let planning_table = extract::extract_plan(&solved, catalog);
            let report = report::audit(&solved, catalog, config, planning_table.clone());
            Ok((solved, planning_table, report))
        }
    }
}
