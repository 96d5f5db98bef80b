//! Gender mix and satisfaction breakdowns.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::table::{EmployeeTable, DEPARTMENT, GENDER};
use crate::diagnostics::Diagnostic;
use crate::stats::round_to;

/// Satisfaction scores averaged per group.
pub const SATISFACTION_COLUMNS: [&str; 3] =
    ["JobSatisfaction", "EnvironmentSatisfaction", "WorkLifeBalance"];

/// Gender headcount and share within one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentGenderMix {
    pub department: String,
    /// Every gender seen in the table, zero-filled.
    pub counts: BTreeMap<String, usize>,
    /// Percent of the department's headcount, 2 decimals.
    pub percentages: BTreeMap<String, f64>,
}

/// Mean satisfaction scores for one group, 2 decimals.
/// Keys are the available [`SATISFACTION_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionMeans {
    pub group: String,
    pub means: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityReport {
    pub gender_by_department: Vec<DepartmentGenderMix>,
    pub satisfaction_by_gender: Vec<SatisfactionMeans>,
    pub satisfaction_by_department: Vec<SatisfactionMeans>,
}

pub fn analyze_diversity(table: &EmployeeTable) -> (DiversityReport, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let mut report = DiversityReport::default();

    let genders = table.text_column(GENDER);
    let departments = table.text_column(DEPARTMENT);

    match (&departments, &genders) {
        (Some(depts), Some(gens)) => {
            report.gender_by_department = gender_mix(depts, gens);
            let summary: Vec<String> = report
                .gender_by_department
                .iter()
                .map(|m| {
                    let shares: Vec<String> = m
                        .percentages
                        .iter()
                        .map(|(g, p)| format!("{g} {p:.1}%"))
                        .collect();
                    format!("{} [{}]", m.department, shares.join(", "))
                })
                .collect();
            diags.push(Diagnostic::ok(format!(
                "Gender distribution by department: {}",
                summary.join("; ")
            )));
        }
        _ => diags.push(Diagnostic::warn(format!(
            "Gender mix skipped: requires {DEPARTMENT} and {GENDER} columns"
        ))),
    }

    let available: Vec<&str> = SATISFACTION_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.has_column(c))
        .collect();
    let missing: Vec<&str> = SATISFACTION_COLUMNS
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        diags.push(Diagnostic::warn(format!(
            "Satisfaction columns missing: {missing:?}"
        )));
    }

    if !available.is_empty() {
        if let Some(gens) = &genders {
            report.satisfaction_by_gender = satisfaction_means(table, gens, &available);
            diags.push(Diagnostic::ok(format!(
                "Satisfaction by gender: {} groups",
                report.satisfaction_by_gender.len()
            )));
        }
        if let Some(depts) = &departments {
            report.satisfaction_by_department = satisfaction_means(table, depts, &available);
        }
    }

    (report, diags)
}

fn gender_mix(departments: &[&str], genders: &[&str]) -> Vec<DepartmentGenderMix> {
    let all_genders: BTreeSet<&str> = genders.iter().copied().collect();
    let mut counts: BTreeMap<&str, BTreeMap<String, usize>> = BTreeMap::new();
    for (&d, &g) in departments.iter().zip(genders) {
        let entry = counts.entry(d).or_insert_with(|| {
            all_genders.iter().map(|g| (g.to_string(), 0)).collect()
        });
        *entry.entry(g.to_string()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(dept, counts)| {
            let total: usize = counts.values().sum();
            let percentages = counts
                .iter()
                .map(|(g, &c)| (g.clone(), round_to(c as f64 / total as f64 * 100.0, 2)))
                .collect();
            DepartmentGenderMix {
                department: dept.to_string(),
                counts,
                percentages,
            }
        })
        .collect()
}

/// Means of the given columns per group label, groups sorted by label.
/// Null cells are left out of the mean.
fn satisfaction_means(
    table: &EmployeeTable,
    groups: &[&str],
    columns: &[&str],
) -> Vec<SatisfactionMeans> {
    let values: Vec<(&str, Vec<f64>)> = columns
        .iter()
        .filter_map(|c| table.numeric_column(c).map(|v| (*c, v)))
        .collect();

    // group -> column -> (sum, count)
    let mut acc: BTreeMap<&str, BTreeMap<&str, (f64, usize)>> = BTreeMap::new();
    for (i, &g) in groups.iter().enumerate() {
        let per_col = acc.entry(g).or_default();
        for (col, vals) in &values {
            let slot = per_col.entry(*col).or_insert((0.0, 0));
            if vals[i].is_finite() {
                slot.0 += vals[i];
                slot.1 += 1;
            }
        }
    }

    acc.into_iter()
        .map(|(group, cols)| SatisfactionMeans {
            group: group.to_string(),
            means: cols
                .into_iter()
                .filter(|(_, (_, n))| *n > 0)
                .map(|(c, (sum, n))| (c.to_string(), round_to(sum / n as f64, 2)))
                .collect(),
        })
        .collect()
}
