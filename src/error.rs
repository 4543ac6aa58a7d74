//! Error taxonomy for the scheduling engine (spec §7).

use thiserror::Error;

/// A single catalog/invariant violation, collected rather than raised
/// immediately so the caller sees every problem in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnknownShiftInNeed { shift_id: String, date: chrono::NaiveDate },
    UnknownFunctionForEmployee { employee_id: String, function_id: String },
    UnknownQualificationInFunction { function_id: String, shift_id: String },
    ReservedShiftId { shift_id: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UnknownShiftInNeed { shift_id, date } => write!(
                f,
                "need on {date} references unknown shift id '{shift_id}'"
            ),
            ValidationError::UnknownFunctionForEmployee { employee_id, function_id } => write!(
                f,
                "employee '{employee_id}' references unknown function '{function_id}'"
            ),
            ValidationError::UnknownQualificationInFunction { function_id, shift_id } => write!(
                f,
                "function '{function_id}' references unknown shift id '{shift_id}'"
            ),
            ValidationError::ReservedShiftId { shift_id } => write!(
                f,
                "shift id '{shift_id}' is reserved and cannot appear in the catalog"
            ),
        }
    }
}

/// A dropped-and-logged constraint parse issue (spec §7: "Parse warnings").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub employee_id: String,
    pub raw: String,
    pub reason: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dropping constraint '{}' for employee '{}': {}",
            self.raw, self.employee_id, self.reason
        )
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("catalog failed validation with {} issue(s): {}", .0.len(), join_display(.0))]
    Validation(Vec<ValidationError>),

    #[error("solver reached its time budget without a feasible incumbent")]
    NoSolution,

    #[error("solver backend error: {0}")]
    SolverBackend(String),
}

fn join_display(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
