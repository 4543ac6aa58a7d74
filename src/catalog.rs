//! Normalized in-memory domain model (spec §3, §4.A).
//!
//! `Catalog::build` is the only entry point: it consumes the already-parsed
//! external shapes from §6 and either returns a fully validated, immutable
//! catalog or the complete list of invariant violations it found.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ParseWarning, ValidationError};

pub const MINUTES_IN_DAY: i64 = 24 * 60;

/// Shift ids that must never appear in the catalog (spec §9 open question,
/// resolved here in favor of rejecting them early).
const RESERVED_SHIFT_IDS: [&str; 3] = ["HOL", "OFF", "INSI"];

pub type ShiftId = String;

// ---------------------------------------------------------------------
// External input shapes (spec §6) — already parsed by the (out of scope)
// loader; this crate only owns what's consumed from here down.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftsCatalogEntry {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCatalogEntry {
    pub id: String,
    pub qualifications: Vec<ShiftId>,
}

/// Dict-form constraint, mirroring the parsed `Constraint` shape (spec §6).
/// String-form parsing (`"HOLIDAY(2024-01-01)"`) is the loader's concern and
/// is not implemented here (spec §9 design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintInput {
    Holiday { date: NaiveDate },
    Vacation { start: NaiveDate, end: NaiveDate },
    FixedOff { weekday: String },
    NotWeekend,
    MaxHours { value: i64 },
    MaxShiftsPerQualif { function: String, value: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeInput {
    pub id: String,
    pub name: String,
    /// Already partitioned by the loader from the mixed qualifications list
    /// (spec §9 "dynamic qualification sources").
    pub function_ids: Vec<String>,
    pub constraints: Vec<ConstraintInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedInput {
    pub date: NaiveDate,
    pub shift_id: ShiftId,
    pub count: i64,
}

// ---------------------------------------------------------------------
// Normalized internal model
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub id: ShiftId,
    pub start_minutes: i64,
    pub end_minutes: i64,
    pub duration_minutes: i64,
}

impl Shift {
    fn from_entry(id: &str, entry: &ShiftsCatalogEntry) -> Self {
        let start_minutes = parse_hhmm(&entry.start_time).unwrap_or_else(|| {
            warn!(shift = id, value = %entry.start_time, "invalid start_time, flagging shift as 0-minute");
            0
        });
        let end_minutes = parse_hhmm(&entry.end_time).unwrap_or_else(|| {
            warn!(shift = id, value = %entry.end_time, "invalid end_time, flagging shift as 0-minute");
            0
        });
        let duration_minutes = (end_minutes - start_minutes).rem_euclid(MINUTES_IN_DAY);
        Self { id: id.to_string(), start_minutes, end_minutes, duration_minutes }
    }
}

fn parse_hhmm(s: &str) -> Option<i64> {
    let (h, m) = s.split_once(':')?;
    let h: i64 = h.parse().ok()?;
    let m: i64 = m.parse().ok()?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return None;
    }
    Some(h * 60 + m)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub id: String,
    pub qualifications: HashSet<ShiftId>,
}

/// A normalized, per-employee constraint (spec §3's tagged `Constraint`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeConstraint {
    Holiday(NaiveDate),
    FixedOff(Weekday),
    MaxHours(i64),
    MaxShiftsPerQualif(String, i64),
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub functions: HashSet<String>,
    pub qualifications: HashSet<ShiftId>,
    pub constraints: Vec<EmployeeConstraint>,
}

impl Employee {
    pub fn is_qualified_for(&self, shift_id: &str) -> bool {
        self.qualifications.contains(shift_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Need {
    pub date: NaiveDate,
    pub shift_id: ShiftId,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    /// Indices into `Catalog::employees`.
    pub member_indices: Vec<usize>,
}

pub const AUTRES_GROUP_NAME: &str = "11. Autres";

#[derive(Debug, Clone)]
pub struct Catalog {
    pub shifts: BTreeMap<ShiftId, Shift>,
    pub functions: BTreeMap<String, Function>,
    pub employees: Vec<Employee>,
    pub employee_index_by_id: HashMap<String, usize>,
    pub needs: Vec<Need>,
    pub groups: Vec<Group>,
    /// Inclusive, ascending list of every date in the horizon (spec §3).
    pub horizon: Vec<NaiveDate>,
}

impl Catalog {
    pub fn weekday_of(&self, date: NaiveDate) -> Weekday {
        date.weekday()
    }

    pub fn employee_by_id(&self, id: &str) -> Option<&Employee> {
        self.employee_index_by_id.get(id).map(|&i| &self.employees[i])
    }

    pub fn group_of(&self, employee_idx: usize) -> Option<&Group> {
        self.groups.iter().find(|g| g.member_indices.contains(&employee_idx))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn build(
        shifts_catalog: &HashMap<String, ShiftsCatalogEntry>,
        functions_catalog: &[FunctionCatalogEntry],
        employees_input: &[EmployeeInput],
        daily_needs: &[NeedInput],
        groups_input: &HashMap<String, Vec<String>>,
    ) -> Result<(Catalog, Vec<ParseWarning>), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for reserved in RESERVED_SHIFT_IDS {
            if shifts_catalog.contains_key(reserved) {
                errors.push(ValidationError::ReservedShiftId { shift_id: reserved.to_string() });
            }
        }

        let shifts: BTreeMap<ShiftId, Shift> = shifts_catalog
            .iter()
            .map(|(id, entry)| (id.clone(), Shift::from_entry(id, entry)))
            .collect();

        let functions: BTreeMap<String, Function> = functions_catalog
            .iter()
            .map(|f| {
                (
                    f.id.clone(),
                    Function {
                        id: f.id.clone(),
                        qualifications: f.qualifications.iter().cloned().collect(),
                    },
                )
            })
            .collect();

        for f in functions_catalog {
            for qualif in &f.qualifications {
                if !shifts.contains_key(qualif) {
                    errors.push(ValidationError::UnknownQualificationInFunction {
                        function_id: f.id.clone(),
                        shift_id: qualif.clone(),
                    });
                }
            }
        }

        let mut employees = Vec::with_capacity(employees_input.len());
        for input in employees_input {
            let mut qualifications = HashSet::new();
            for function_id in &input.function_ids {
                match functions.get(function_id) {
                    Some(function) => qualifications.extend(function.qualifications.iter().cloned()),
                    None => errors.push(ValidationError::UnknownFunctionForEmployee {
                        employee_id: input.id.clone(),
                        function_id: function_id.clone(),
                    }),
                }
            }

            let mut constraints = Vec::new();
            for raw in &input.constraints {
                let (expanded, mut w) = normalize_constraint(&input.id, raw);
                constraints.extend(expanded);
                warnings.append(&mut w);
            }

            employees.push(Employee {
                id: input.id.clone(),
                name: input.name.clone(),
                functions: input.function_ids.iter().cloned().collect(),
                qualifications,
                constraints,
            });
        }

        let employee_index_by_id: HashMap<String, usize> =
            employees.iter().enumerate().map(|(i, e)| (e.id.clone(), i)).collect();

        let needs: Vec<Need> = daily_needs
            .iter()
            .filter(|n| !RESERVED_SHIFT_IDS.contains(&n.shift_id.as_str()))
            .map(|n| Need { date: n.date, shift_id: n.shift_id.clone(), count: n.count })
            .collect();

        for need in &needs {
            if !shifts.contains_key(&need.shift_id) {
                errors.push(ValidationError::UnknownShiftInNeed {
                    shift_id: need.shift_id.clone(),
                    date: need.date,
                });
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let horizon = compute_horizon(&needs);
        let groups = build_groups(groups_input, &employee_index_by_id, employees.len());

        Ok((
            Catalog { shifts, functions, employees, employee_index_by_id, needs, groups, horizon },
            warnings,
        ))
    }
}

fn compute_horizon(needs: &[Need]) -> Vec<NaiveDate> {
    let Some(min) = needs.iter().map(|n| n.date).min() else {
        return Vec::new();
    };
    let max = needs.iter().map(|n| n.date).max().unwrap();
    let mut horizon = Vec::new();
    let mut current = min;
    while current <= max {
        horizon.push(current);
        current = current.succ_opt().expect("date within representable range");
    }
    horizon
}

fn build_groups(
    groups_input: &HashMap<String, Vec<String>>,
    employee_index_by_id: &HashMap<String, usize>,
    employee_count: usize,
) -> Vec<Group> {
    let mut covered: HashSet<usize> = HashSet::new();
    let mut groups: Vec<Group> = Vec::new();

    let mut names: Vec<&String> = groups_input.keys().collect();
    names.sort();

    for name in names {
        let member_ids = &groups_input[name];
        let mut member_indices = Vec::new();
        for id in member_ids {
            match employee_index_by_id.get(id) {
                Some(&idx) => {
                    member_indices.push(idx);
                    covered.insert(idx);
                }
                None => warn!(group = name, employee_id = id, "group references unknown employee id"),
            }
        }
        if !member_indices.is_empty() {
            groups.push(Group { name: name.clone(), member_indices });
        }
    }

    let uncovered: Vec<usize> = (0..employee_count).filter(|i| !covered.contains(i)).collect();
    if !uncovered.is_empty() {
        groups.push(Group { name: AUTRES_GROUP_NAME.to_string(), member_indices: uncovered });
    }

    groups
}

/// Expands `Vacation`/`NotWeekend` and parses the free weekday name,
/// producing `ParseWarning`s for anything malformed rather than failing the
/// whole employee (spec §7 "Parse warnings").
fn normalize_constraint(employee_id: &str, input: &ConstraintInput) -> (Vec<EmployeeConstraint>, Vec<ParseWarning>) {
    let mut warnings = Vec::new();
    let constraints = match input {
        ConstraintInput::Holiday { date } => vec![EmployeeConstraint::Holiday(*date)],
        ConstraintInput::Vacation { start, end } => {
            if end < start {
                warnings.push(ParseWarning {
                    employee_id: employee_id.to_string(),
                    raw: format!("VACATION({start},{end})"),
                    reason: "end date precedes start date".to_string(),
                });
                vec![]
            } else {
                let mut days = Vec::new();
                let mut current = *start;
                while current <= *end {
                    days.push(EmployeeConstraint::Holiday(current));
                    current = current.succ_opt().expect("date within representable range");
                }
                days
            }
        }
        ConstraintInput::FixedOff { weekday } => match parse_weekday(weekday) {
            Some(wd) => vec![EmployeeConstraint::FixedOff(wd)],
            None => {
                warnings.push(ParseWarning {
                    employee_id: employee_id.to_string(),
                    raw: format!("FIXED_OFF({weekday})"),
                    reason: "unknown weekday name".to_string(),
                });
                vec![]
            }
        },
        ConstraintInput::NotWeekend => vec![
            EmployeeConstraint::FixedOff(Weekday::Sat),
            EmployeeConstraint::FixedOff(Weekday::Sun),
        ],
        ConstraintInput::MaxHours { value } => vec![EmployeeConstraint::MaxHours(*value)],
        ConstraintInput::MaxShiftsPerQualif { function, value } => {
            vec![EmployeeConstraint::MaxShiftsPerQualif(function.clone(), *value)]
        }
    };
    (constraints, warnings)
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_uppercase().as_str() {
        "MONDAY" => Some(Weekday::Mon),
        "TUESDAY" => Some(Weekday::Tue),
        "WEDNESDAY" => Some(Weekday::Wed),
        "THURSDAY" => Some(Weekday::Thu),
        "FRIDAY" => Some(Weekday::Fri),
        "SATURDAY" => Some(Weekday::Sat),
        "SUNDAY" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: &str, end: &str) -> ShiftsCatalogEntry {
        ShiftsCatalogEntry { start_time: start.to_string(), end_time: end.to_string() }
    }

    #[test]
    fn overnight_shift_duration_wraps_past_midnight() {
        let shift = Shift::from_entry("LATE", &entry("20:00", "04:00"));
        assert_eq!(shift.duration_minutes, 8 * 60);
    }

    #[test]
    fn invalid_time_string_flags_shift_as_zero_minute() {
        let shift = Shift::from_entry("BAD", &entry("nope", "10:00"));
        assert_eq!(shift.start_minutes, 0);
    }

    #[test]
    fn reserved_shift_id_is_rejected() {
        let mut shifts = HashMap::new();
        shifts.insert("HOL".to_string(), entry("08:00", "16:00"));
        let result = Catalog::build(&shifts, &[], &[], &[], &HashMap::new());
        assert!(matches!(result, Err(errors) if errors.iter().any(|e| matches!(e, ValidationError::ReservedShiftId { .. }))));
    }

    #[test]
    fn unknown_shift_in_need_is_a_validation_error() {
        let mut shifts = HashMap::new();
        shifts.insert("A".to_string(), entry("08:00", "16:00"));
        let needs = vec![NeedInput { date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), shift_id: "B".to_string(), count: 1 }];
        let result = Catalog::build(&shifts, &[], &[], &needs, &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn uncovered_employees_fall_into_autres_group() {
        let mut shifts = HashMap::new();
        shifts.insert("A".to_string(), entry("08:00", "16:00"));
        let employees = vec![EmployeeInput {
            id: "e1".to_string(),
            name: "Alice".to_string(),
            function_ids: vec![],
            constraints: vec![],
        }];
        let (catalog, _) = Catalog::build(&shifts, &[], &employees, &[], &HashMap::new()).unwrap();
        assert_eq!(catalog.groups.len(), 1);
        assert_eq!(catalog.groups[0].name, AUTRES_GROUP_NAME);
    }

    #[test]
    fn empty_groups_are_dropped() {
        let mut groups_input = HashMap::new();
        groups_input.insert("Empty Group".to_string(), vec!["missing".to_string()]);
        let (catalog, _) = Catalog::build(&HashMap::new(), &[], &[], &[], &groups_input).unwrap();
        assert!(catalog.groups.iter().all(|g| g.name != "Empty Group"));
    }

    #[test]
    fn vacation_expands_to_inclusive_holiday_range() {
        let (expanded, warnings) = normalize_constraint(
            "e1",
            &ConstraintInput::Vacation {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            },
        );
        assert!(warnings.is_empty());
        assert_eq!(expanded.len(), 3);
    }

    #[test]
    fn not_weekend_expands_to_both_fixed_offs() {
        let (expanded, _) = normalize_constraint("e1", &ConstraintInput::NotWeekend);
        assert_eq!(expanded.len(), 2);
        assert!(expanded.contains(&EmployeeConstraint::FixedOff(Weekday::Sat)));
        assert!(expanded.contains(&EmployeeConstraint::FixedOff(Weekday::Sun)));
    }

    #[test]
    fn unknown_weekday_is_dropped_with_warning() {
        let (expanded, warnings) = normalize_constraint(
            "e1",
            &ConstraintInput::FixedOff { weekday: "FUNDAY".to_string() },
        );
        assert!(expanded.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
