//! HR analytics engine: attrition rates and drivers, pay gap tests,
//! diversity breakdowns, attrition classifier.
//!
//! Every analysis degrades gracefully: a missing column or a sample-size
//! guard produces a warning diagnostic and the dependent result is omitted.

pub mod attrition;
pub mod classifier;
pub mod diversity;
pub mod pay_gap;
pub mod table;

pub use attrition::{
    attrition_by_department, attrition_rate, rank_drivers, CorrelationRecord, DepartmentAttrition,
    CANDIDATE_FEATURES,
};
pub use classifier::{train_attrition_model, AttritionModel, ClassifierConfig, FeatureCoefficient, ModelMetrics};
pub use diversity::{analyze_diversity, DiversityReport};
pub use pay_gap::{analyze_pay_gap, GroupIncomeSummary, PayGapConfig, PayGapRecord, PayGapReport};
pub use table::{EmployeeFilter, EmployeeTable, REQUIRED_COLUMNS};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::diagnostics::Diagnostic;
use table::{ATTRITION, DEPARTMENT};

#[derive(Debug, Error)]
pub enum HrError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Settings for all HR analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrConfig {
    pub pay_gap: PayGapConfig,
    pub classifier: ClassifierConfig,
}

/// Everything the HR engine derives from one employee table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrReport {
    pub employees: usize,
    pub global_attrition_rate: Option<f64>,
    pub department_attrition: Option<Vec<DepartmentAttrition>>,
    pub drivers: Vec<CorrelationRecord>,
    pub model: Option<AttritionModel>,
    pub pay_gap: Option<PayGapReport>,
    pub diversity: DiversityReport,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run every HR analysis on an already filtered table.
pub fn analyze(table: &EmployeeTable, config: &HrConfig) -> HrReport {
    let mut diagnostics = Vec::new();

    let global_attrition_rate = attrition_rate(table);
    match global_attrition_rate {
        Some(rate) => {
            info!(pipeline = "hr", rate, employees = table.len(), "attrition rate");
            diagnostics.push(Diagnostic::ok(format!(
                "Global attrition rate: {:.1}%",
                rate * 100.0
            )));
        }
        None if !table.has_column(ATTRITION) => diagnostics.push(Diagnostic::warn(format!(
            "Attrition rate skipped: no {ATTRITION} column"
        ))),
        None => diagnostics.push(Diagnostic::warn("Attrition rate skipped: no employees")),
    }

    let department_attrition = attrition_by_department(table);
    match &department_attrition {
        Some(rows) => {
            let parts: Vec<String> = rows
                .iter()
                .map(|d| format!("{} {:.1}%", d.department, d.attrition_rate_pct))
                .collect();
            diagnostics.push(Diagnostic::ok(format!(
                "Attrition by department: {}",
                parts.join(", ")
            )));
        }
        None => {
            let missing: Vec<&str> = [DEPARTMENT, ATTRITION]
                .into_iter()
                .filter(|c| !table.has_column(c))
                .collect();
            diagnostics.push(Diagnostic::warn(format!(
                "Department attrition skipped: missing {}",
                missing.join(", ")
            )));
        }
    }

    let (drivers, diags) = rank_drivers(table);
    diagnostics.extend(diags);

    let (model, diags) = train_attrition_model(table, &drivers, &config.classifier);
    diagnostics.extend(diags);

    let (pay_gap, diags) = analyze_pay_gap(table, &config.pay_gap);
    diagnostics.extend(diags);

    let (diversity, diags) = analyze_diversity(table);
    diagnostics.extend(diags);

    HrReport {
        employees: table.len(),
        global_attrition_rate,
        department_attrition,
        drivers,
        model,
        pay_gap,
        diversity,
        diagnostics,
    }
}
