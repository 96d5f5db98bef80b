//! Gender pay gap on monthly income: global and per-department t-tests.
//!
//! The gap is expressed relative to the higher of the two group means and is
//! positive when group A earns more. Department tests use the raw p-value
//! with no multiple-comparison correction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::table::{EmployeeTable, DEPARTMENT, GENDER, MONTHLY_INCOME};
use crate::diagnostics::Diagnostic;
use crate::stats::{mean, median, round_to, std_dev, two_sample_t_test, TTestKind};

/// Scope label of the whole-table comparison.
pub const GLOBAL_SCOPE: &str = "Global";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayGapConfig {
    pub group_a: String,
    pub group_b: String,
    pub significance: f64,
    /// A department is tested only when both groups exceed this size.
    pub min_department_group: usize,
    pub t_test: TTestKind,
}

impl Default for PayGapConfig {
    fn default() -> Self {
        Self {
            group_a: "Male".into(),
            group_b: "Female".into(),
            significance: 0.05,
            min_department_group: 5,
            t_test: TTestKind::Student,
        }
    }
}

/// Income distribution of one gender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupIncomeSummary {
    pub group: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; NaN with a single observation.
    pub std: f64,
    pub count: usize,
}

/// One group comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayGapRecord {
    /// `Global` or the department name.
    pub scope: String,
    pub group_a_mean: f64,
    pub group_b_mean: f64,
    /// Percent of the higher mean, 2 decimals.
    pub gap_pct: f64,
    pub gap_abs: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub n_a: usize,
    pub n_b: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayGapReport {
    pub income_by_group: Vec<GroupIncomeSummary>,
    pub global: Option<PayGapRecord>,
    pub departments: Vec<PayGapRecord>,
}

/// `(a − b) / max(a, b) × 100`; zero when both means are zero.
pub fn gap_percent(mean_a: f64, mean_b: f64) -> f64 {
    let reference = mean_a.max(mean_b);
    if reference == 0.0 {
        0.0
    } else {
        (mean_a - mean_b) / reference * 100.0
    }
}

/// Compare two income samples. `None` when either has fewer than 2 values.
pub fn compare_groups(
    scope: &str,
    a: &[f64],
    b: &[f64],
    config: &PayGapConfig,
) -> Option<PayGapRecord> {
    let test = two_sample_t_test(a, b, config.t_test)?;
    let (ma, mb) = (mean(a), mean(b));
    Some(PayGapRecord {
        scope: scope.to_string(),
        group_a_mean: round_to(ma, 2),
        group_b_mean: round_to(mb, 2),
        gap_pct: round_to(gap_percent(ma, mb), 2),
        gap_abs: round_to(ma - mb, 2),
        t_statistic: round_to(test.t_statistic, 4),
        p_value: round_to(test.p_value, 4),
        significant: test.p_value < config.significance,
        n_a: a.len(),
        n_b: b.len(),
    })
}

/// Income summary per gender, sorted by gender label.
pub fn income_by_gender(table: &EmployeeTable) -> Option<Vec<GroupIncomeSummary>> {
    let genders = table.text_column(GENDER)?;
    let income = table.numeric_column(MONTHLY_INCOME)?;
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (g, v) in genders.into_iter().zip(income) {
        if v.is_finite() {
            groups.entry(g).or_default().push(v);
        }
    }
    Some(
        groups
            .into_iter()
            .map(|(g, values)| GroupIncomeSummary {
                group: g.to_string(),
                mean: mean(&values),
                median: median(&values),
                std: std_dev(&values, 1),
                count: values.len(),
            })
            .collect(),
    )
}

/// Global and per-department pay gap analysis.
pub fn analyze_pay_gap(
    table: &EmployeeTable,
    config: &PayGapConfig,
) -> (Option<PayGapReport>, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let (Some(genders), Some(income)) = (
        table.text_column(GENDER),
        table.numeric_column(MONTHLY_INCOME),
    ) else {
        diags.push(Diagnostic::warn(format!(
            "Pay gap skipped: requires {GENDER} and {MONTHLY_INCOME} columns"
        )));
        return (None, diags);
    };

    let income_by_group = income_by_gender(table).unwrap_or_default();
    for s in &income_by_group {
        diags.push(Diagnostic::ok(format!(
            "Income {}: mean={:.2}, median={:.2}, std={:.2}, n={}",
            s.group, s.mean, s.median, s.std, s.count
        )));
    }

    let split = |rows: &mut dyn Iterator<Item = usize>| {
        let (mut a, mut b) = (Vec::new(), Vec::new());
        for i in rows {
            if !income[i].is_finite() {
                continue;
            }
            if genders[i] == config.group_a {
                a.push(income[i]);
            } else if genders[i] == config.group_b {
                b.push(income[i]);
            }
        }
        (a, b)
    };

    let (a, b) = split(&mut (0..table.len()));
    let global = compare_groups(GLOBAL_SCOPE, &a, &b, config);
    match &global {
        Some(g) => {
            info!(pipeline = "hr", t = g.t_statistic, p = g.p_value, gap_pct = g.gap_pct, "global pay gap");
            diags.push(Diagnostic::ok(format!(
                "Global t-test: t={:.4}, p={:.4}, gap={:.1}%",
                g.t_statistic, g.p_value, g.gap_pct
            )));
        }
        None => diags.push(Diagnostic::warn(format!(
            "Global t-test skipped: {} {} / {} {} observations, need 2 each",
            a.len(),
            config.group_a,
            b.len(),
            config.group_b
        ))),
    }

    let mut departments = Vec::new();
    match table.text_column(DEPARTMENT) {
        None => diags.push(Diagnostic::warn(format!(
            "Department pay gap skipped: no {DEPARTMENT} column"
        ))),
        Some(depts) => {
            // first-appearance order
            let mut order: Vec<&str> = Vec::new();
            for d in &depts {
                if !order.contains(d) {
                    order.push(*d);
                }
            }
            for dept in order {
                let (a, b) = split(&mut (0..table.len()).filter(|&i| depts[i] == dept));
                if a.len() <= config.min_department_group || b.len() <= config.min_department_group {
                    diags.push(Diagnostic::warn(format!(
                        "{dept}: pay gap skipped ({} {} / {} {}, need more than {})",
                        a.len(),
                        config.group_a,
                        b.len(),
                        config.group_b,
                        config.min_department_group
                    )));
                    continue;
                }
                if let Some(record) = compare_groups(dept, &a, &b, config) {
                    departments.push(record);
                }
            }
            let significant = departments.iter().filter(|r| r.significant).count();
            diags.push(Diagnostic::ok(format!(
                "Department pay gap: {} tested, {significant} significant at p<{}",
                departments.len(),
                config.significance
            )));
        }
    }

    if let Some(g) = &global {
        let verdict = if g.significant { "SIGNIFICANT" } else { "not significant" };
        diags.push(Diagnostic::qa(format!(
            "Global t-test p-value: {} ({verdict}, alpha={})",
            g.p_value, config.significance
        )));
    }

    (
        Some(PayGapReport {
            income_by_group,
            global,
            departments,
        }),
        diags,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, f64)]) -> EmployeeTable {
        let headers = ["Department", "Gender", "MonthlyIncome"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|(d, g, inc)| vec![d.to_string(), g.to_string(), inc.to_string()])
            .collect();
        EmployeeTable::new(headers, rows)
    }

    #[test]
    fn gap_relative_to_higher_mean() {
        assert_eq!(gap_percent(5000.0, 4000.0), 20.0);
        assert_eq!(gap_percent(4000.0, 5000.0), -20.0);
        assert_eq!(gap_percent(0.0, 0.0), 0.0);
    }

    #[test]
    fn equal_means_have_zero_gap() {
        let a = [4000.0, 5000.0, 6000.0, 4500.0, 5500.0];
        let b = [5500.0, 4500.0, 6000.0, 5000.0, 4000.0];
        let r = compare_groups("Global", &a, &b, &PayGapConfig::default()).unwrap();
        assert_eq!(r.gap_pct, 0.0);
        assert_eq!(r.p_value, 1.0);
        assert!(!r.significant);
    }

    #[test]
    fn small_departments_are_skipped() {
        let mut rows = Vec::new();
        for i in 0..6 {
            rows.push(("Sales", "Male", 5000.0 + i as f64 * 100.0));
            rows.push(("Sales", "Female", 4000.0 + i as f64 * 100.0));
        }
        // exactly 5 per group: not more than 5
        for i in 0..5 {
            rows.push(("HR", "Male", 3000.0 + i as f64));
            rows.push(("HR", "Female", 3000.0 + i as f64));
        }
        let (report, diags) = analyze_pay_gap(&table(&rows), &PayGapConfig::default());
        let report = report.unwrap();
        assert_eq!(report.departments.len(), 1);
        assert_eq!(report.departments[0].scope, "Sales");
        assert!(report.departments[0].significant);
        assert!(diags.iter().any(|d| d.message.starts_with("HR: pay gap skipped")));
        assert_eq!(report.global.unwrap().n_a, 11);
        assert_eq!(report.income_by_group.len(), 2);
        assert_eq!(report.income_by_group[0].group, "Female");
    }

    #[test]
    fn missing_income_column_skips() {
        let headers = vec!["Gender".to_string()];
        let t = EmployeeTable::new(headers, vec![vec!["Male".into()]]);
        let (report, diags) = analyze_pay_gap(&t, &PayGapConfig::default());
        assert!(report.is_none());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn single_group_global_skipped() {
        let t = table(&[("Sales", "Male", 1.0), ("Sales", "Male", 2.0)]);
        let (report, _) = analyze_pay_gap(&t, &PayGapConfig::default());
        assert!(report.unwrap().global.is_none());
    }
}
