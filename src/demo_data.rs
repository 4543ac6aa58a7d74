//! Synthetic fixture generator, generalized from the upstream quickstart's
//! `DemoData::{Small,Large}` pattern to this crate's catalog shapes.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::catalog::{EmployeeInput, FunctionCatalogEntry, NeedInput, ShiftsCatalogEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoSize {
    Small,
    Large,
}

impl std::str::FromStr for DemoSize {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoSize::Small),
            "LARGE" => Ok(DemoSize::Large),
            _ => Err(()),
        }
    }
}

struct Parameters {
    days_in_schedule: i64,
    employee_count: usize,
    functions: Vec<(&'static str, Vec<&'static str>)>,
}

impl DemoSize {
    fn parameters(self) -> Parameters {
        match self {
            DemoSize::Small => Parameters {
                days_in_schedule: 14,
                employee_count: 10,
                functions: vec![("Nurse", vec!["MORNING", "AFTERNOON"]), ("Aide", vec!["AFTERNOON", "NIGHT"])],
            },
            DemoSize::Large => Parameters {
                days_in_schedule: 30,
                employee_count: 40,
                functions: vec![
                    ("Nurse", vec!["MORNING", "AFTERNOON", "NIGHT"]),
                    ("Aide", vec!["AFTERNOON", "NIGHT"]),
                    ("Supervisor", vec!["MORNING"]),
                ],
            },
        }
    }
}

pub struct DemoInput {
    pub shifts_catalog: HashMap<String, ShiftsCatalogEntry>,
    pub functions_catalog: Vec<FunctionCatalogEntry>,
    pub employees: Vec<EmployeeInput>,
    pub daily_needs: Vec<NeedInput>,
    pub groups: HashMap<String, Vec<String>>,
}

const FIRST_NAMES: [&str; 8] = ["Alice", "Bilal", "Chloe", "Dmitri", "Elena", "Farid", "Greta", "Hassan"];
const LAST_NAMES: [&str; 8] = ["Nyberg", "Haddad", "Okafor", "Ivanova", "Dubois", "Khan", "Larsen", "Moreau"];

fn shift_times(shift_id: &str) -> (&'static str, &'static str) {
    match shift_id {
        "MORNING" => ("07:00", "15:00"),
        "AFTERNOON" => ("15:00", "23:00"),
        "NIGHT" => ("23:00", "07:00"),
        _ => ("00:00", "08:00"),
    }
}

/// Builds a deterministic synthetic input, seeded so fixture-driven tests
/// stay reproducible across runs (same idiom as the upstream generator's
/// fixed start-of-2024 anchor).
pub fn generate(size: DemoSize, seed: u64) -> DemoInput {
    let mut rng = StdRng::seed_from_u64(seed);
    let params = size.parameters();

    let mut shift_ids: Vec<&str> = Vec::new();
    for (_, shifts) in &params.functions {
        for s in shifts {
            if !shift_ids.contains(s) {
                shift_ids.push(s);
            }
        }
    }

    let shifts_catalog: HashMap<String, ShiftsCatalogEntry> = shift_ids
        .iter()
        .map(|id| {
            let (start, end) = shift_times(id);
            (id.to_string(), ShiftsCatalogEntry { start_time: start.to_string(), end_time: end.to_string() })
        })
        .collect();

    let functions_catalog: Vec<FunctionCatalogEntry> = params
        .functions
        .iter()
        .map(|(name, shifts)| FunctionCatalogEntry {
            id: name.to_string(),
            qualifications: shifts.iter().map(|s| s.to_string()).collect(),
        })
        .collect();

    let mut employees = Vec::with_capacity(params.employee_count);
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for i in 0..params.employee_count {
        let id = format!("e{i}");
        let first = FIRST_NAMES[i % FIRST_NAMES.len()];
        let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
        let function = &params.functions[i % params.functions.len()].0;
        let group_name = format!("{function} team");
        groups.entry(group_name).or_default().push(id.clone());

        let mut constraints = Vec::new();
        if rng.gen_bool(0.1) {
            constraints.push(crate::catalog::ConstraintInput::MaxHours { value: 140 });
        }

        employees.push(EmployeeInput {
            id,
            name: format!("{first} {last}"),
            function_ids: vec![function.to_string()],
            constraints,
        });
    }

    let start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut daily_needs = Vec::new();
    for day in 0..params.days_in_schedule {
        let date = start_date + Duration::days(day);
        for shift_id in &shift_ids {
            let count = rng.gen_range(1..=3);
            daily_needs.push(NeedInput { date, shift_id: shift_id.to_string(), count });
        }
    }
    daily_needs.shuffle(&mut rng);

    DemoInput { shifts_catalog, functions_catalog, employees, daily_needs, groups }
}
