//! HR pipeline: load → QA → filter → analyze → exports.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use meridian_core::diagnostics::{self, Diagnostic, Severity};
use meridian_core::hr::{
    self, AttritionModel, DepartmentAttrition, DiversityReport, EmployeeFilter, EmployeeTable,
    GroupIncomeSummary, HrReport, PayGapRecord,
};

use crate::config::PipelineConfig;
use crate::error::RunError;
use crate::export::{remove_stale, write_json, write_records, write_table};
use crate::run_log::{Pipeline, RunLog};

pub const HR_CLEAN_FILE: &str = "hr_clean.csv";
pub const HR_DEPARTMENT_FILE: &str = "hr_attrition_by_department.csv";
pub const HR_DRIVERS_FILE: &str = "hr_attrition_drivers.csv";
pub const HR_PAY_GAP_FILE: &str = "hr_pay_gap.csv";
pub const HR_COEFFICIENTS_FILE: &str = "hr_model_coefficients.csv";
pub const HR_SUMMARY_FILE: &str = "hr_summary.json";

/// Every file the HR pipeline may write.
pub const HR_OUTPUT_FILES: [&str; 6] = [
    HR_CLEAN_FILE,
    HR_DEPARTMENT_FILE,
    HR_DRIVERS_FILE,
    HR_PAY_GAP_FILE,
    HR_COEFFICIENTS_FILE,
    HR_SUMMARY_FILE,
];

const DEPARTMENT_HEADERS: [&str; 4] =
    ["department", "attrition_rate", "attrition_rate_pct", "headcount"];
const DRIVER_HEADERS: [&str; 3] = ["feature", "spearman_r", "p_value"];
const PAY_GAP_HEADERS: [&str; 10] = [
    "scope",
    "group_a_mean",
    "group_b_mean",
    "gap_pct",
    "gap_abs",
    "t_statistic",
    "p_value",
    "significant",
    "n_a",
    "n_b",
];
const COEFFICIENT_HEADERS: [&str; 2] = ["feature", "coefficient"];

/// Everything the HR pipeline produced.
#[derive(Debug, Clone)]
pub struct HrOutcome {
    pub employees_loaded: usize,
    pub report: HrReport,
    pub diagnostics: Vec<Diagnostic>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct HrSummary<'a> {
    source: &'a Path,
    employees_loaded: usize,
    employees_analyzed: usize,
    filter: &'a EmployeeFilter,
    global_attrition_rate: Option<f64>,
    department_attrition: Option<&'a [DepartmentAttrition]>,
    top_drivers: Vec<&'a str>,
    model: Option<&'a AttritionModel>,
    income_by_group: &'a [GroupIncomeSummary],
    pay_gap_global: Option<&'a PayGapRecord>,
    diversity: &'a DiversityReport,
    warnings: usize,
    errors: usize,
}

/// Run the HR pipeline and append its diagnostics to `log`.
///
/// A missing or unreadable source file is logged and returned as
/// [`RunError::HrSource`]; it does not affect the financial pipeline.
pub fn run_hr(config: &PipelineConfig, log: &RunLog) -> Result<HrOutcome> {
    let settings = &config.hr;
    let source = &settings.source;
    info!(pipeline = "hr", source = %source.display(), "starting");

    let table = match EmployeeTable::from_path(source) {
        Ok(table) => table,
        Err(e) => {
            error!(pipeline = "hr", source = %source.display(), error = %e, "dataset load failed");
            let diag = Diagnostic::error(format!(
                "Cannot load HR dataset {}: {e}",
                source.display()
            ));
            for name in HR_OUTPUT_FILES {
                remove_stale(&config.paths.output(name))?;
            }
            log.append(Pipeline::Hr, &[diag])
                .with_context(|| format!("append run log {}", log.path().display()))?;
            return Err(RunError::HrSource {
                path: source.display().to_string(),
                source: e,
            }
            .into());
        }
    };

    let mut diags = table.quality_report();
    let employees_loaded = table.len();

    let table = if settings.filter.is_empty() {
        table
    } else {
        let filtered = table.filter(&settings.filter);
        diags.push(Diagnostic::ok(format!(
            "Filter applied (departments={:?}, genders={:?}): {} of {} employees",
            settings.filter.departments,
            settings.filter.genders,
            filtered.len(),
            employees_loaded
        )));
        if filtered.is_empty() {
            warn!(pipeline = "hr", "filter matched no employees");
            diags.push(Diagnostic::warn("Filter matched no employees"));
        }
        filtered
    };

    let report = hr::analyze(&table, &settings.engine_config());
    diags.extend(report.diagnostics.iter().cloned());

    let out = &config.paths;
    let mut files = Vec::new();

    let clean = out.output(HR_CLEAN_FILE);
    write_table(&clean, &table.export_headers(), table.export_rows())?;
    files.push(clean);

    // A skipped stage removes its file from earlier runs.
    let mut stale = Vec::new();

    let path = out.output(HR_DEPARTMENT_FILE);
    match &report.department_attrition {
        Some(rows) => {
            write_records(&path, &DEPARTMENT_HEADERS, rows)?;
            files.push(path);
        }
        None => stale.push(path),
    }

    let path = out.output(HR_DRIVERS_FILE);
    if table.attrition().is_none() {
        stale.push(path);
    } else {
        write_records(&path, &DRIVER_HEADERS, &report.drivers)?;
        files.push(path);
    }

    let path = out.output(HR_PAY_GAP_FILE);
    match &report.pay_gap {
        Some(gap) => {
            let rows: Vec<&PayGapRecord> = gap.global.iter().chain(&gap.departments).collect();
            write_records(&path, &PAY_GAP_HEADERS, &rows)?;
            files.push(path);
        }
        None => stale.push(path),
    }

    let path = out.output(HR_COEFFICIENTS_FILE);
    match &report.model {
        Some(model) => {
            write_records(&path, &COEFFICIENT_HEADERS, &model.coefficients)?;
            files.push(path);
        }
        None => stale.push(path),
    }

    for path in &stale {
        if remove_stale(path)? {
            diags.push(Diagnostic::warn(format!(
                "Removed stale {} (stage skipped this run)",
                path.display()
            )));
        }
    }

    let summary_path = out.output(HR_SUMMARY_FILE);
    write_json(
        &summary_path,
        &summarize(source, employees_loaded, &settings.filter, &report, &diags),
    )?;
    files.push(summary_path);

    diags.push(Diagnostic::ok(format!(
        "HR pipeline complete: {} files written to {}",
        files.len(),
        out.output_dir.display()
    )));
    log.append(Pipeline::Hr, &diags)
        .with_context(|| format!("append run log {}", log.path().display()))?;

    Ok(HrOutcome {
        employees_loaded,
        report,
        diagnostics: diags,
        files,
    })
}

fn summarize<'a>(
    source: &'a Path,
    employees_loaded: usize,
    filter: &'a EmployeeFilter,
    report: &'a HrReport,
    diags: &[Diagnostic],
) -> HrSummary<'a> {
    HrSummary {
        source,
        employees_loaded,
        employees_analyzed: report.employees,
        filter,
        global_attrition_rate: report.global_attrition_rate,
        department_attrition: report.department_attrition.as_deref(),
        top_drivers: report
            .drivers
            .iter()
            .take(10)
            .map(|d| d.feature.as_str())
            .collect(),
        model: report.model.as_ref(),
        income_by_group: report
            .pay_gap
            .as_ref()
            .map(|g| g.income_by_group.as_slice())
            .unwrap_or(&[]),
        pay_gap_global: report.pay_gap.as_ref().and_then(|g| g.global.as_ref()),
        diversity: &report.diversity,
        warnings: diagnostics::count(diags, Severity::Warn),
        errors: diagnostics::count(diags, Severity::Error),
    }
}
