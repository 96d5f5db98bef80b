//! Attrition rates and driver ranking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::table::{EmployeeTable, ATTRITION, DEPARTMENT, OVERTIME};
use crate::diagnostics::Diagnostic;
use crate::stats::{median, round_to, spearman};

/// Numeric candidates for driver ranking, in reporting order.
pub const CANDIDATE_FEATURES: [&str; 13] = [
    "Age",
    "MonthlyIncome",
    "TotalWorkingYears",
    "YearsAtCompany",
    "JobLevel",
    "JobSatisfaction",
    "EnvironmentSatisfaction",
    "DistanceFromHome",
    "NumCompaniesWorked",
    "YearsInCurrentRole",
    "YearsSinceLastPromotion",
    "WorkLifeBalance",
    "PerformanceRating",
];

/// Attrition rate for one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentAttrition {
    pub department: String,
    pub attrition_rate: f64,
    /// Rate in percent, 1 decimal.
    pub attrition_rate_pct: f64,
    pub headcount: usize,
}

/// Spearman correlation of one feature with the attrition flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub feature: String,
    /// Rounded to 4 decimals.
    pub spearman_r: f64,
    /// Rounded to 4 decimals.
    pub p_value: f64,
}

/// Share of rows with attrition. `None` for an empty table or when there is
/// no `Attrition` column.
pub fn attrition_rate(table: &EmployeeTable) -> Option<f64> {
    let flags = table.attrition()?;
    if flags.is_empty() {
        return None;
    }
    let leavers: usize = flags.iter().map(|&a| a as usize).sum();
    Some(leavers as f64 / flags.len() as f64)
}

/// Rates per department, sorted by department name. `None` unless both the
/// `Department` and `Attrition` columns are present.
pub fn attrition_by_department(table: &EmployeeTable) -> Option<Vec<DepartmentAttrition>> {
    let departments = table.text_column(DEPARTMENT)?;
    let flags = table.attrition()?;
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (dept, &flag) in departments.iter().zip(flags) {
        let entry = groups.entry(*dept).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += flag as usize;
    }
    Some(
        groups
            .into_iter()
            .map(|(dept, (headcount, leavers))| {
                let rate = leavers as f64 / headcount as f64;
                DepartmentAttrition {
                    department: dept.to_string(),
                    attrition_rate: rate,
                    attrition_rate_pct: round_to(rate * 100.0, 1),
                    headcount,
                }
            })
            .collect(),
    )
}

/// Feature values with nulls replaced by the column median.
///
/// `OverTime` is binarized (`Yes` = 1). Returns `None` if the column is
/// absent or has no numeric values.
pub fn feature_values(table: &EmployeeTable, feature: &str) -> Option<Vec<f64>> {
    if feature == OVERTIME {
        let text = table.text_column(OVERTIME)?;
        return Some(text.iter().map(|v| f64::from(u8::from(*v == "Yes"))).collect());
    }
    let raw = table.numeric_column(feature)?;
    let present: Vec<f64> = raw.iter().copied().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        return None;
    }
    let fill = median(&present);
    Some(
        raw.into_iter()
            .map(|v| if v.is_finite() { v } else { fill })
            .collect(),
    )
}

/// Rank candidate features by absolute Spearman correlation with attrition.
///
/// Absent or constant features are skipped with a warning.
pub fn rank_drivers(table: &EmployeeTable) -> (Vec<CorrelationRecord>, Vec<Diagnostic>) {
    rank_features(table, &driver_candidates())
}

/// The numeric candidates followed by the binarized overtime flag.
pub fn driver_candidates() -> Vec<&'static str> {
    let mut c = CANDIDATE_FEATURES.to_vec();
    c.push(OVERTIME);
    c
}

/// Rank an explicit feature list by absolute Spearman correlation.
pub fn rank_features(
    table: &EmployeeTable,
    features: &[&str],
) -> (Vec<CorrelationRecord>, Vec<Diagnostic>) {
    let mut records = Vec::new();
    let mut diags = Vec::new();
    let Some(target) = table.attrition_f64() else {
        warn!(pipeline = "hr", "driver ranking skipped, no attrition column");
        diags.push(Diagnostic::warn(format!(
            "Driver ranking skipped: no {ATTRITION} column"
        )));
        return (records, diags);
    };

    for &feature in features {
        let Some(values) = feature_values(table, feature) else {
            if table.has_column(feature) {
                diags.push(Diagnostic::warn(format!("{feature}: no numeric values, skipped")));
            }
            continue;
        };
        match spearman(&values, &target) {
            Some(test) => records.push(CorrelationRecord {
                feature: feature.to_string(),
                spearman_r: round_to(test.coefficient, 4),
                p_value: round_to(test.p_value, 4),
            }),
            None => {
                warn!(pipeline = "hr", feature, "correlation undefined, skipping");
                diags.push(Diagnostic::warn(format!(
                    "{feature}: correlation undefined (constant values), skipped"
                )));
            }
        }
    }

    // stable: ties keep candidate order
    records.sort_by(|a, b| b.spearman_r.abs().total_cmp(&a.spearman_r.abs()));
    let top: Vec<String> = records
        .iter()
        .take(10)
        .map(|r| format!("{} ({:+.4})", r.feature, r.spearman_r))
        .collect();
    diags.push(Diagnostic::ok(format!("Top attrition drivers: {}", top.join(", "))));
    (records, diags)
}
