//! Policy configuration consumed by the core (spec §6).
//!
//! Loading this from TOML/JSON/env is the external loader's job; this crate
//! only owns the parsed shape and its defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_min_off_days_per_month() -> i64 {
    8
}

fn default_max_consecutive_work_days() -> i64 {
    6
}

fn default_isolated_day_off_penalty() -> i64 {
    1000
}

fn default_intra_group_work_days_equity_penalty() -> i64 {
    5000
}

fn default_intra_group_shift_equity_penalty() -> i64 {
    500
}

/// Weight keys from spec §4.C.2, one field per soft rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalties {
    pub per_missing_need_unit: i64,
    #[serde(default = "default_per_day_off_missing")]
    pub per_day_off_missing: i64,
    #[serde(default = "default_no_weekend_guaranteed")]
    pub no_weekend_guaranteed: i64,
    #[serde(default = "default_intra_group_work_days_equity_penalty")]
    pub penalty_intra_group_work_days_equity_gap: i64,
    #[serde(default = "default_intra_group_shift_equity_penalty")]
    pub penalty_intra_group_shift_equity_gap: i64,
    #[serde(default = "default_per_consecutive_work_day_violation")]
    pub per_consecutive_work_day_violation: i64,
    #[serde(default = "default_isolated_day_off_penalty")]
    pub penalty_isolated_day_off: i64,
}

fn default_per_day_off_missing() -> i64 {
    100
}
fn default_no_weekend_guaranteed() -> i64 {
    2000
}
fn default_per_consecutive_work_day_violation() -> i64 {
    3000
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            per_missing_need_unit: 10_000,
            per_day_off_missing: default_per_day_off_missing(),
            no_weekend_guaranteed: default_no_weekend_guaranteed(),
            penalty_intra_group_work_days_equity_gap: default_intra_group_work_days_equity_penalty(),
            penalty_intra_group_shift_equity_gap: default_intra_group_shift_equity_penalty(),
            per_consecutive_work_day_violation: default_per_consecutive_work_day_violation(),
            penalty_isolated_day_off: default_isolated_day_off_penalty(),
        }
    }
}

/// One entry of `config.specific_agent_rules` (spec §4.C.1 rule 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificAgentRule {
    pub agent_ids: Vec<String>,
    pub target_function: String,
    pub min_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub min_rest_hours: i64,
    pub solver_time_limit_seconds: u64,
    #[serde(default = "default_min_off_days_per_month")]
    pub min_off_days_per_month: i64,
    #[serde(default = "default_max_consecutive_work_days")]
    pub max_consecutive_work_days: i64,
    #[serde(default)]
    pub group_min_off_days: HashMap<String, i64>,
    #[serde(default)]
    pub specific_agent_rules: Vec<SpecificAgentRule>,
    pub penalties: Penalties,
}

impl Config {
    /// Target for spec §4.C.2 S2: the group override if one exists for this
    /// group, otherwise the global default.
    pub fn off_days_target_for_group(&self, group_name: &str) -> i64 {
        self.group_min_off_days
            .get(group_name)
            .copied()
            .unwrap_or(self.min_off_days_per_month)
    }
}
